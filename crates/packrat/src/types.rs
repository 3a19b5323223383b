//! Shared type definitions for the packrat crate
//!
//! Common types used across discovery and assembly, kept here to avoid
//! circular module dependencies.

use std::path::PathBuf;

/// Classification of a module based on its origin
///
/// Drives every downstream decision: first-party modules are copied into the
/// bundle, third-party packages end up in the manifest, and stdlib modules
/// are ignored entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// Python standard library modules (e.g., os, sys, json)
    StandardLibrary,

    /// Third-party packages installed into a virtual environment
    ThirdParty,

    /// First-party modules that belong to the project being bundled
    FirstParty,
}

impl ModuleKind {
    /// Check if this is a standard library module
    pub fn is_stdlib(&self) -> bool {
        matches!(self, Self::StandardLibrary)
    }

    /// Check if this is a third-party module
    pub fn is_third_party(&self) -> bool {
        matches!(self, Self::ThirdParty)
    }

    /// Check if this is a first-party module
    pub fn is_first_party(&self) -> bool {
        matches!(self, Self::FirstParty)
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StandardLibrary => write!(f, "stdlib"),
            Self::ThirdParty => write!(f, "third-party"),
            Self::FirstParty => write!(f, "first-party"),
        }
    }
}

/// A resolved module: its dotted name, backing file (if any), and origin.
///
/// Namespace packages and builtins resolve without a backing file, so the
/// path is optional. Immutable once produced by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    /// Top-level dotted module name as it appeared in the import
    pub name: String,
    /// Absolute path of the backing file, if one exists
    pub path: Option<PathBuf>,
    /// Origin classification
    pub kind: ModuleKind,
}

/// An installed third-party package recorded for the requirements manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThirdPartyPackage {
    /// PEP 503 normalized package name
    pub name: String,
    /// Declared version from the installed distribution metadata
    pub version: String,
}

impl std::fmt::Display for ThirdPartyPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_kind_predicates() {
        assert!(ModuleKind::StandardLibrary.is_stdlib());
        assert!(ModuleKind::ThirdParty.is_third_party());
        assert!(ModuleKind::FirstParty.is_first_party());
        assert!(!ModuleKind::FirstParty.is_third_party());
    }

    #[test]
    fn test_package_requirement_line() {
        let pkg = ThirdPartyPackage {
            name: "requests".to_owned(),
            version: "2.31.0".to_owned(),
        };
        assert_eq!(pkg.to_string(), "requests==2.31.0");
    }
}
