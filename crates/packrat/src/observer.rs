//! Runtime dependency observation
//!
//! Static analysis cannot see conditionally- or lazily-imported modules.
//! Running the project's test suite is a pragmatic probe for those paths:
//! whatever the interpreter loads while the tests execute is a real
//! dependency, whether or not the tests pass.
//!
//! The module registry diff lives behind the [`ModuleProbe`] trait so the
//! folding logic can be tested against a fake registry instead of a live
//! interpreter.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result};
use log::{debug, warn};
use tempfile::NamedTempFile;

/// A module observed as loaded during the runtime probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// Dotted module name as it appeared in the module registry
    pub name: String,
    /// Backing file, absent for builtins and namespace packages
    pub path: Option<PathBuf>,
}

/// Interface over the process-wide module registry diff: which modules were
/// newly loaded as a side effect of running the given test suite, and what
/// file backs each one.
pub trait ModuleProbe {
    fn modules_loaded_by(&self, tests_path: &Path) -> Result<Vec<LoadedModule>>;
}

/// Python harness executed by [`PytestProbe`].
///
/// Snapshots `sys.modules`, puts the test directory's parent on `sys.path`,
/// runs pytest verbosely, then writes one `name<TAB>file` line per newly
/// loaded module. Test failures are deliberately swallowed: the probe cares
/// about load side effects, not outcomes.
const PROBE_HARNESS: &str = r#"
import os
import sys

tests_path, out_path = sys.argv[1], sys.argv[2]
before = set(sys.modules)

sys.path.insert(0, os.path.dirname(os.path.abspath(tests_path)))
try:
    import pytest
    pytest.main([tests_path, "-v"])
except Exception as exc:
    print("packrat: test run failed: %s" % exc, file=sys.stderr)

with open(out_path, "w") as out:
    for name in sorted(set(sys.modules) - before):
        module = sys.modules.get(name)
        filename = getattr(module, "__file__", None) or ""
        out.write("%s\t%s\n" % (name, filename))
"#;

/// Probe that runs the test suite under pytest in a child interpreter.
#[derive(Debug)]
pub struct PytestProbe {
    python: PathBuf,
}

impl PytestProbe {
    pub fn new(python: PathBuf) -> Self {
        Self { python }
    }
}

impl ModuleProbe for PytestProbe {
    fn modules_loaded_by(&self, tests_path: &Path) -> Result<Vec<LoadedModule>> {
        let report = NamedTempFile::new().context("failed to create probe report file")?;

        let status = Command::new(&self.python)
            .arg("-c")
            .arg(PROBE_HARNESS)
            .arg(tests_path)
            .arg(report.path())
            .status()
            .with_context(|| {
                format!(
                    "failed to launch test interpreter {}",
                    self.python.display()
                )
            })?;
        // A failing suite still loads modules; only log the status.
        debug!("test interpreter exited with {status}");

        let contents = std::fs::read_to_string(report.path())
            .context("failed to read probe report file")?;
        Ok(parse_probe_report(&contents))
    }
}

/// Parse the `name<TAB>file` lines the harness writes.
fn parse_probe_report(contents: &str) -> Vec<LoadedModule> {
    contents
        .lines()
        .filter_map(|line| {
            let (name, file) = line.split_once('\t')?;
            if name.is_empty() {
                warn!("skipping malformed probe report line: {line:?}");
                return None;
            }
            Some(LoadedModule {
                name: name.to_owned(),
                path: if file.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(file))
                },
            })
        })
        .collect()
}
