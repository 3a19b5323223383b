//! packrat builds a self-contained deployment bundle for a single Python
//! entry-point script.
//!
//! Discovery is two-phase: a static walk of the import graph (parsing, not
//! executing) unioned with runtime observation of the modules loaded while
//! the project's test suite runs. First-party files are copied into an
//! output tree; third-party packages are recorded in a requirements
//! manifest.

pub mod bundle;
pub mod collector;
pub mod config;
pub mod extractor;
pub mod metadata;
pub mod observer;
pub mod resolver;
pub mod stdlib;
pub mod types;
pub mod walker;
