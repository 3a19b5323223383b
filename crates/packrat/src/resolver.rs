//! Module resolution and classification
//!
//! Given a top-level module name, locate its backing file on disk and
//! classify it as first-party (project-owned), third-party (installed into
//! a virtual environment), or standard library. Search directories, in
//! order: the entry point's directory, PYTHONPATH entries, configured `src`
//! directories, then the virtual environment's site-packages directories.
//!
//! Resolution order inside each directory follows Python's own rules:
//! package (`foo/__init__.py`), then file module (`foo.py`), then namespace
//! package (`foo/` without `__init__.py`).

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

use crate::{
    config::Config,
    metadata::{DistInfoIndex, PackageIndex},
    stdlib::is_stdlib_module,
    types::{ModuleKind, ModuleReference, ThirdPartyPackage},
};

pub struct ModuleResolver {
    config: Config,
    /// Project root; everything bundled must live under it
    project_root: PathBuf,
    /// Entry-point script; always copied, never treated as a dependency
    entry_path: PathBuf,
    /// Cache of resolved module paths, including negative results
    module_cache: IndexMap<String, Option<PathBuf>>,
    /// Third-party packages observed while classifying imports,
    /// keyed by normalized name
    third_party: IndexMap<String, ThirdPartyPackage>,
    /// Metadata backend for mapping installed files to packages
    package_index: Box<dyn PackageIndex>,
    /// PYTHONPATH override for testing
    pythonpath_override: Option<String>,
    /// VIRTUAL_ENV override for testing
    virtualenv_override: Option<String>,
}

impl ModuleResolver {
    pub fn new(config: Config, project_root: PathBuf, entry_path: PathBuf) -> Self {
        Self::with_package_index(config, project_root, entry_path, Box::new(DistInfoIndex::new()))
    }

    /// Create a resolver with a custom metadata backend
    pub fn with_package_index(
        config: Config,
        project_root: PathBuf,
        entry_path: PathBuf,
        package_index: Box<dyn PackageIndex>,
    ) -> Self {
        Self {
            config,
            project_root,
            entry_path,
            module_cache: IndexMap::new(),
            third_party: IndexMap::new(),
            package_index,
            pythonpath_override: None,
            virtualenv_override: None,
        }
    }

    /// Override PYTHONPATH for testing, instead of reading the process
    /// environment
    pub fn with_pythonpath(mut self, pythonpath: &str) -> Self {
        self.pythonpath_override = Some(pythonpath.to_owned());
        self
    }

    /// Override VIRTUAL_ENV for testing, instead of reading the process
    /// environment
    pub fn with_virtualenv(mut self, virtualenv: &str) -> Self {
        self.virtualenv_override = Some(virtualenv.to_owned());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    /// Third-party packages recorded so far, keyed by normalized name
    pub fn third_party_packages(&self) -> &IndexMap<String, ThirdPartyPackage> {
        &self.third_party
    }

    /// Resolve and classify a top-level module name.
    ///
    /// `None` means the module could not be located; that is expected for
    /// builtins, optional imports, and modules only present on other
    /// machines, and is silently skipped by callers. Successful third-party
    /// classification records the package in the manifest set as a side
    /// effect.
    pub fn resolve(&mut self, module_name: &str) -> Option<ModuleReference> {
        if self.config.known_first_party.contains(module_name) {
            let path = self.locate(module_name);
            return Some(ModuleReference {
                name: module_name.to_owned(),
                path,
                kind: ModuleKind::FirstParty,
            });
        }

        if self.config.known_third_party.contains(module_name) {
            let path = self.locate(module_name);
            if let Some(path) = &path {
                self.record_third_party(path);
            }
            return Some(ModuleReference {
                name: module_name.to_owned(),
                path,
                kind: ModuleKind::ThirdParty,
            });
        }

        if is_stdlib_module(module_name, self.config.python_version) {
            return Some(ModuleReference {
                name: module_name.to_owned(),
                path: None,
                kind: ModuleKind::StandardLibrary,
            });
        }

        let path = self.locate(module_name)?;
        let kind = if self.is_venv_path(&path) {
            self.record_third_party(&path);
            ModuleKind::ThirdParty
        } else if self.is_project_owned(&path) {
            ModuleKind::FirstParty
        } else {
            // Resolvable but neither ours nor installed: part of the
            // runtime environment, ignored
            ModuleKind::StandardLibrary
        };

        Some(ModuleReference {
            name: module_name.to_owned(),
            path: Some(path),
            kind,
        })
    }

    /// Check if a path sits inside a virtual environment or installed
    /// package directory. Substring heuristic from the original tool:
    /// any `venv` (case-insensitive) or `site-packages` path segment.
    pub fn is_venv_path(&self, path: &Path) -> bool {
        let lowered = path.to_string_lossy().to_lowercase();
        lowered.contains("venv") || lowered.contains("site-packages")
    }

    /// Check if a path is project-owned: under the project root, not the
    /// entry point itself, and not inside a virtual environment.
    pub fn is_project_owned(&self, path: &Path) -> bool {
        if path == self.entry_path {
            return false;
        }
        if self.is_venv_path(path) {
            return false;
        }
        path.strip_prefix(&self.project_root).is_ok()
    }

    /// Locate the backing file for a module name across the search
    /// directories. Absence is not an error.
    fn locate(&mut self, module_name: &str) -> Option<PathBuf> {
        if let Some(cached) = self.module_cache.get(module_name) {
            return cached.clone();
        }

        let resolved = self
            .search_directories()
            .iter()
            .find_map(|dir| Self::resolve_in_directory(dir, module_name));

        match &resolved {
            Some(path) => debug!("resolved module '{module_name}' to {}", path.display()),
            None => debug!("module '{module_name}' not found in any search directory"),
        }
        self.module_cache
            .insert(module_name.to_owned(), resolved.clone());
        resolved
    }

    /// Resolve a module within one directory: package first, then file
    /// module, then namespace directory.
    fn resolve_in_directory(root: &Path, module_name: &str) -> Option<PathBuf> {
        let package_init = root.join(module_name).join("__init__.py");
        if package_init.is_file() {
            return Some(canonicalize_or_keep(package_init));
        }

        let module_file = root.join(format!("{module_name}.py"));
        if module_file.is_file() {
            return Some(canonicalize_or_keep(module_file));
        }

        let namespace_dir = root.join(module_name);
        if namespace_dir.is_dir() {
            return Some(canonicalize_or_keep(namespace_dir));
        }

        None
    }

    /// All directories to search for modules, deduplicated and in priority
    /// order.
    fn search_directories(&self) -> Vec<PathBuf> {
        let mut unique_dirs = IndexSet::new();

        // 1. Entry file's directory is always first
        if let Some(entry_dir) = self.entry_path.parent() {
            unique_dirs.insert(canonicalize_or_keep(entry_dir.to_path_buf()));
        }

        // 2. PYTHONPATH directories
        let pythonpath = self
            .pythonpath_override
            .clone()
            .or_else(|| std::env::var("PYTHONPATH").ok());
        if let Some(pythonpath) = pythonpath {
            let separator = if cfg!(windows) { ';' } else { ':' };
            for path_str in pythonpath.split(separator) {
                if path_str.is_empty() {
                    continue;
                }
                let path = PathBuf::from(path_str);
                if path.is_dir() {
                    unique_dirs.insert(canonicalize_or_keep(path));
                }
            }
        }

        // 3. Configured src directories
        for dir in &self.config.src {
            unique_dirs.insert(canonicalize_or_keep(dir.clone()));
        }

        // 4. Virtual environment site-packages, so third-party imports
        //    resolve and can be recorded in the manifest
        for venv in self.virtualenv_paths() {
            for site_packages in site_packages_directories(&venv) {
                unique_dirs.insert(canonicalize_or_keep(site_packages));
            }
        }

        unique_dirs.into_iter().collect()
    }

    /// Virtual environments to consider: an explicit VIRTUAL_ENV, or
    /// common venv directory names under the project root.
    fn virtualenv_paths(&self) -> Vec<PathBuf> {
        let explicit = self
            .virtualenv_override
            .clone()
            .or_else(|| std::env::var("VIRTUAL_ENV").ok());
        if let Some(venv) = explicit {
            return vec![PathBuf::from(venv)];
        }

        const COMMON_VENV_NAMES: [&str; 5] = [".venv", "venv", "env", ".virtualenv", "virtualenv"];
        COMMON_VENV_NAMES
            .iter()
            .map(|name| self.project_root.join(name))
            .filter(|path| {
                let has_bin = path.join("bin").is_dir() || path.join("Scripts").is_dir();
                let has_lib = path.join("lib").is_dir() || path.join("Lib").is_dir();
                has_bin || has_lib
            })
            .collect()
    }

    /// Map an installed module file to its distribution and record it.
    /// Missing metadata is expected and dropped after a debug log.
    fn record_third_party(&mut self, module_path: &Path) {
        match self.package_index.resolve(module_path) {
            Some(package) => {
                debug!("recording third-party package {package}");
                self.third_party.insert(package.name.clone(), package);
            }
            None => {
                debug!(
                    "no package metadata for {}, leaving it out of the manifest",
                    module_path.display()
                );
            }
        }
    }
}

/// Site-packages directories inside a virtual environment, covering both
/// the Unix layout (`lib/pythonX.Y/site-packages`) and the Windows layout
/// (`Lib/site-packages`).
fn site_packages_directories(venv_path: &Path) -> Vec<PathBuf> {
    let mut site_packages_dirs = Vec::new();

    let lib_dir = venv_path.join("lib");
    if lib_dir.is_dir()
        && let Ok(entries) = std::fs::read_dir(&lib_dir)
    {
        for entry in entries.flatten() {
            let site_packages = entry.path().join("site-packages");
            if site_packages.is_dir() {
                site_packages_dirs.push(site_packages);
            }
        }
    }

    let lib_site_packages = venv_path.join("Lib").join("site-packages");
    if lib_site_packages.is_dir() {
        site_packages_dirs.push(lib_site_packages);
    }

    site_packages_dirs
}

/// Canonicalize a path, keeping the original on failure
fn canonicalize_or_keep(path: PathBuf) -> PathBuf {
    match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(e) => {
            warn!("failed to canonicalize path {}: {e}", path.display());
            path
        }
    }
}
