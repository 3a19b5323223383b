//! Configuration for a bundling run
//!
//! Loaded from `packrat.toml` in the project root, falling back to a
//! user-level config file, falling back to defaults. Everything is optional;
//! a project with no config file gets the defaults below.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use etcetera::BaseStrategy;
use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Serialize};

/// File name looked up in the project root and the user config directory
const CONFIG_FILE_NAME: &str = "packrat.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Additional source directories to search for first-party modules.
    /// The entry point's own directory is always searched first.
    pub src: Vec<PathBuf>,

    /// Module names forced to be treated as first-party
    pub known_first_party: IndexSet<String>,

    /// Module names forced to be treated as third-party
    pub known_third_party: IndexSet<String>,

    /// File suffixes (without the dot) swept from discovered module
    /// directories as non-code configuration artifacts
    pub config_extensions: IndexSet<String>,

    /// Python minor version used for stdlib classification
    /// (e.g., 11 for Python 3.11)
    pub python_version: u8,

    /// Interpreter used to run the test suite for runtime discovery
    pub python_executable: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src: Vec::new(),
            known_first_party: IndexSet::new(),
            known_third_party: IndexSet::new(),
            config_extensions: ["txt", "yaml", "yml", "json"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            python_version: 11,
            python_executable: PathBuf::from("python3"),
        }
    }
}

impl Config {
    /// Load configuration for a project rooted at `project_root`.
    ///
    /// Lookup order: `<project_root>/packrat.toml`, then
    /// `<user config dir>/packrat/packrat.toml`, then built-in defaults.
    pub fn load(project_root: &Path) -> Result<Self> {
        let project_config = project_root.join(CONFIG_FILE_NAME);
        if project_config.is_file() {
            return Self::from_file(&project_config);
        }

        if let Ok(strategy) = etcetera::choose_base_strategy() {
            let user_config = strategy.config_dir().join("packrat").join(CONFIG_FILE_NAME);
            if user_config.is_file() {
                return Self::from_file(&user_config);
            }
        }

        debug!("no {CONFIG_FILE_NAME} found, using defaults");
        Ok(Self::default())
    }

    /// Parse a config file, failing loudly on malformed TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Check whether a path carries one of the configured non-code suffixes.
    /// Comparison is case-insensitive, matching `.YAML` as well as `.yaml`.
    pub fn is_config_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.config_extensions.contains(ext.as_str())
            })
    }
}
