//! Standard library detection
//!
//! Single source of truth for deciding whether an imported name belongs to
//! the Python standard library. Stdlib imports are never resolved on disk
//! and never appear in the requirements manifest.

use ruff_python_stdlib::sys;

/// Check if a module name represents a Python standard library module
///
/// Uses ruff's stdlib database and handles both direct matches and
/// submodules (e.g., both "os" and "os.path" are recognized).
///
/// `python_version` is the minor version as a u8 (e.g., 11 for Python 3.11).
pub fn is_stdlib_module(module_name: &str, python_version: u8) -> bool {
    // __future__ is always stdlib but is not part of ruff's database
    if module_name == "__future__" {
        return true;
    }

    if sys::is_known_standard_library(python_version, module_name) {
        return true;
    }

    // Submodule of a stdlib module
    if let Some(top_level) = module_name.split('.').next() {
        sys::is_known_standard_library(python_version, top_level)
    } else {
        false
    }
}
