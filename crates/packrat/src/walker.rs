//! Static dependency graph traversal
//!
//! Walks the import graph rooted at the entry-point file with an explicit
//! worklist, using the collected-file set itself as the visited set. Import
//! graphs routinely contain cycles (mutual imports); the membership check
//! before enqueueing guarantees termination and ensures every file is
//! analyzed at most once.
//!
//! Alongside every visited module, the containing directory is swept for
//! configuration files (templates, schemas, fixtures) that static import
//! analysis cannot see.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use anyhow::Result;
use indexmap::IndexSet;
use log::debug;
use walkdir::WalkDir;

use crate::{extractor, resolver::ModuleResolver};

/// Worklist-driven walker over the static import graph.
pub struct StaticWalker<'a> {
    resolver: &'a mut ModuleResolver,
    collected: &'a mut IndexSet<PathBuf>,
}

impl<'a> StaticWalker<'a> {
    pub fn new(resolver: &'a mut ModuleResolver, collected: &'a mut IndexSet<PathBuf>) -> Self {
        Self {
            resolver,
            collected,
        }
    }

    /// Traverse the import graph from `entry`, folding every reachable
    /// first-party module and swept config file into the collected set.
    ///
    /// Fails on unreadable or unparsable source; unresolvable imports are
    /// skipped.
    pub fn walk(&mut self, entry: &Path) -> Result<()> {
        let mut pending: VecDeque<PathBuf> = VecDeque::new();
        pending.push_back(entry.to_path_buf());

        while let Some(path) = pending.pop_front() {
            debug!("analyzing {}", path.display());
            let imports = extractor::imports_from_file(&path)?;
            sweep_config_files(&path, self.resolver, self.collected);

            for module_name in imports {
                let Some(reference) = self.resolver.resolve(&module_name) else {
                    continue;
                };
                let Some(module_path) = reference.path else {
                    continue;
                };
                // Namespace packages resolve to directories; there is no
                // source file to analyze or copy for those.
                if !reference.kind.is_first_party() || !module_path.is_file() {
                    continue;
                }
                if self.collected.insert(module_path.clone()) {
                    pending.push_back(module_path);
                }
            }
        }

        Ok(())
    }
}

/// Sweep the directory containing `module_path` for configuration files.
///
/// Recurses through subdirectories; every project-owned file whose suffix
/// matches the configured extension set is added to the collected set.
/// Re-sweeping a directory is a no-op for files already collected.
#[allow(clippy::print_stdout)] // discovery notices are part of the CLI surface
pub fn sweep_config_files(
    module_path: &Path,
    resolver: &ModuleResolver,
    collected: &mut IndexSet<PathBuf>,
) {
    let Some(module_dir) = module_path.parent() else {
        return;
    };

    for entry in WalkDir::new(module_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !resolver.config().is_config_file(path) || !resolver.is_project_owned(path) {
            continue;
        }
        if collected.insert(path.to_path_buf()) {
            let display = path
                .strip_prefix(resolver.project_root())
                .unwrap_or(path)
                .display();
            println!("Found config file: {display}");
        }
    }
}
