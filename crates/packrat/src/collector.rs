//! Dependency collection driver
//!
//! Owns the collected-file set and the third-party package set for one run,
//! and drives the two discovery phases over them: the static walk of the
//! import graph, then the runtime probe of the test suite. Both phases grow
//! the same sets monotonically; the bundle assembler reads them once at the
//! end.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::{
    bundle::{self, BundleSummary},
    config::Config,
    observer::ModuleProbe,
    resolver::ModuleResolver,
    types::ThirdPartyPackage,
    walker::{StaticWalker, sweep_config_files},
};

pub struct DependencyCollector {
    resolver: ModuleResolver,
    /// Every file destined for the bundle; the entry point is seeded at
    /// construction, before any discovery runs
    collected: IndexSet<PathBuf>,
    output_path: PathBuf,
}

impl DependencyCollector {
    /// Create a collector for an entry-point script under a project root.
    ///
    /// Both paths must exist; the entry point is canonicalized and seeded
    /// into the collected set. The output path defaults to the entry
    /// point's parent directory.
    pub fn new(
        config: Config,
        entry_path: &Path,
        project_root: &Path,
        output_path: Option<&Path>,
    ) -> Result<Self> {
        let entry_path = entry_path.canonicalize().with_context(|| {
            format!("entry point {} does not exist", entry_path.display())
        })?;
        let project_root = project_root.canonicalize().with_context(|| {
            format!("project root {} does not exist", project_root.display())
        })?;
        let output_path = match output_path {
            Some(path) => path.to_path_buf(),
            None => entry_path
                .parent()
                .context("entry point has no parent directory")?
                .to_path_buf(),
        };

        let mut collected = IndexSet::new();
        collected.insert(entry_path.clone());

        Ok(Self {
            resolver: ModuleResolver::new(config, project_root, entry_path),
            collected,
            output_path,
        })
    }

    /// Swap in a custom resolver, used by tests to inject overrides.
    pub fn with_resolver(mut self, resolver: ModuleResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Phase one: walk the static import graph from the entry point.
    pub fn collect_static(&mut self) -> Result<()> {
        let entry = self.resolver.entry_path().to_path_buf();
        StaticWalker::new(&mut self.resolver, &mut self.collected).walk(&entry)
    }

    /// Phase two: fold in modules observed as loaded while the test suite
    /// ran. Each newly discovered first-party module also gets a config
    /// sweep, same as statically discovered ones.
    pub fn collect_runtime(&mut self, probe: &dyn ModuleProbe, tests_path: &Path) -> Result<()> {
        let loaded = probe.modules_loaded_by(tests_path)?;
        debug!("runtime probe reported {} newly loaded modules", loaded.len());

        for module in loaded {
            let Some(path) = module.path else {
                continue;
            };
            let Ok(path) = path.canonicalize() else {
                // Loaded from a file that no longer exists (or a zipimport);
                // nothing to bundle
                debug!("skipping vanished runtime module {}", module.name);
                continue;
            };
            if !path.is_file() || !self.resolver.is_project_owned(&path) {
                continue;
            }
            debug!("runtime discovery: {} ({})", module.name, path.display());
            self.collected.insert(path.clone());
            sweep_config_files(&path, &self.resolver, &mut self.collected);
        }

        Ok(())
    }

    /// Final phase: copy collected project files into the output tree and
    /// write the requirements manifest.
    pub fn assemble_bundle(&self) -> Result<BundleSummary> {
        bundle::assemble(&self.resolver, &self.collected, &self.output_path)
    }

    pub fn collected_files(&self) -> &IndexSet<PathBuf> {
        &self.collected
    }

    pub fn third_party_packages(&self) -> &IndexMap<String, ThirdPartyPackage> {
        self.resolver.third_party_packages()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}
