//! Import extraction via static parsing
//!
//! Parses a single Python source file without executing it and returns the
//! set of top-level module names it imports, wherever the import statement
//! sits in the tree (module level, function bodies, class bodies,
//! conditional blocks). `import x.y` contributes `x`; `from x.y import z`
//! contributes `x`; `from . import z` names no module and contributes
//! nothing.
//!
//! A file that fails to parse is a hard error: an unparsable source file is
//! a discovery gap the caller must see, not something to paper over.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexSet;
use log::trace;
use ruff_python_ast::{
    Stmt,
    visitor::{Visitor, walk_stmt},
};

/// Visitor that records the top-level name of every import statement.
#[derive(Default)]
struct ImportCollector {
    names: IndexSet<String>,
}

impl ImportCollector {
    fn record(&mut self, dotted_name: &str) {
        if let Some(top_level) = dotted_name.split('.').next()
            && !top_level.is_empty()
        {
            self.names.insert(top_level.to_owned());
        }
    }
}

impl<'a> Visitor<'a> for ImportCollector {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Import(import_stmt) => {
                for alias in &import_stmt.names {
                    trace!("found import: {}", alias.name);
                    self.record(alias.name.as_str());
                }
            }
            Stmt::ImportFrom(import_from) => {
                // `from . import x` has no module name; there is nothing to
                // resolve by name in that case.
                if let Some(module) = &import_from.module {
                    trace!("found from-import: {module}");
                    self.record(module.as_str());
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }
}

/// Extract the top-level imported module names from Python source text.
pub fn imports_from_source(source: &str) -> Result<IndexSet<String>> {
    let parsed = ruff_python_parser::parse_module(source)?;
    let module = parsed.into_syntax();

    let mut collector = ImportCollector::default();
    for stmt in &module.body {
        collector.visit_stmt(stmt);
    }
    Ok(collector.names)
}

/// Read and parse a source file, returning its imported top-level names.
///
/// Errors on unreadable files and on syntactically invalid source; both
/// propagate to the caller and abort the run.
pub fn imports_from_file(path: &Path) -> Result<IndexSet<String>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source file {}", path.display()))?;
    imports_from_source(&source)
        .with_context(|| format!("failed to parse source file {}", path.display()))
}
