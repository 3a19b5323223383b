//! Bundle assembly
//!
//! Consumes the final collected sets read-only: copies project files into
//! the output tree mirroring their paths relative to the project root, then
//! writes the `requirements.txt` manifest for observed third-party
//! packages. A file that turns out not to sit under the root is skipped
//! with a warning; one stray file must not sink the bundle.

#![allow(clippy::print_stdout)] // progress lines are the CLI's output contract

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use filetime::FileTime;
use indexmap::IndexSet;
use log::warn;

use crate::resolver::ModuleResolver;

/// Counts reported after assembly.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BundleSummary {
    /// Source files copied
    pub code_files: usize,
    /// Configuration files copied (by suffix)
    pub config_files: usize,
    /// Third-party packages written to the manifest
    pub packages: usize,
}

/// Copy every bundled file into `output_path` and emit the manifest.
pub fn assemble(
    resolver: &ModuleResolver,
    collected: &IndexSet<PathBuf>,
    output_path: &Path,
) -> Result<BundleSummary> {
    let mut summary = BundleSummary::default();
    let root = resolver.project_root();

    for file_path in collected {
        // The entry point is always bundled; everything else must be
        // project-owned (under the root, outside any venv)
        if file_path != resolver.entry_path() && !resolver.is_project_owned(file_path) {
            continue;
        }

        // Defensive: the resolver should only hand us paths under the
        // root, but a misclassification must not abort the whole run
        let Ok(rel_path) = file_path.strip_prefix(root) else {
            warn!(
                "collected file {} is outside the project root, skipping",
                file_path.display()
            );
            continue;
        };

        let target_path = output_path.join(rel_path);
        copy_preserving_mtime(file_path, &target_path)?;

        if resolver.config().is_config_file(file_path) {
            summary.config_files += 1;
        } else {
            summary.code_files += 1;
        }
        println!("Copied: {}", rel_path.display());
    }

    println!(
        "\nCopied {} project files and {} configuration files",
        summary.code_files, summary.config_files
    );

    summary.packages = write_manifest(resolver, output_path)?;
    Ok(summary)
}

/// Copy one file, creating parent directories and carrying over the source
/// modification time (the moral equivalent of `shutil.copy2`).
fn copy_preserving_mtime(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::copy(source, target).with_context(|| {
        format!(
            "failed to copy {} to {}",
            source.display(),
            target.display()
        )
    })?;

    let metadata = std::fs::metadata(source)
        .with_context(|| format!("failed to stat {}", source.display()))?;
    filetime::set_file_mtime(target, FileTime::from_last_modification_time(&metadata))
        .with_context(|| format!("failed to set mtime on {}", target.display()))?;
    Ok(())
}

/// Write `requirements.txt` at the output root, one `name==version` line
/// per package, sorted by name. Nothing is written when no third-party
/// packages were observed.
fn write_manifest(resolver: &ModuleResolver, output_path: &Path) -> Result<usize> {
    let packages = resolver.third_party_packages();
    if packages.is_empty() {
        return Ok(0);
    }

    let mut lines: Vec<String> = packages.values().map(ToString::to_string).collect();
    lines.sort();

    std::fs::create_dir_all(output_path)
        .with_context(|| format!("failed to create directory {}", output_path.display()))?;
    let manifest_path = output_path.join("requirements.txt");
    std::fs::write(&manifest_path, lines.join("\n") + "\n")
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    println!(
        "\nCreated requirements.txt with {} packages",
        packages.len()
    );
    Ok(packages.len())
}
