//! Installed-package metadata lookup
//!
//! Maps a module file inside a site-packages directory back to the installed
//! distribution that owns it, yielding the package's declared name and
//! version for the requirements manifest. The lookup is strictly
//! best-effort: any miss (no dist-info, unreadable metadata, no match)
//! returns `None` and the package is simply absent from the manifest.

use std::path::{Path, PathBuf};

use log::debug;
use pep508_rs::PackageName;

use crate::types::ThirdPartyPackage;

/// Capability interface for resolving a module path to its installed
/// package. Abstracted so tests (and alternate backends) can substitute a
/// fake index without touching resolver logic.
pub trait PackageIndex {
    /// Resolve the backing file of a third-party module to the installed
    /// package that provides it, or `None` if no mapping can be found.
    fn resolve(&self, module_path: &Path) -> Option<ThirdPartyPackage>;
}

/// Metadata index backed by `*.dist-info` directories in site-packages,
/// the layout pip writes for every installed wheel.
#[derive(Debug, Default)]
pub struct DistInfoIndex;

impl DistInfoIndex {
    pub fn new() -> Self {
        Self
    }
}

impl PackageIndex for DistInfoIndex {
    fn resolve(&self, module_path: &Path) -> Option<ThirdPartyPackage> {
        let (site_packages, top_level) = split_site_packages(module_path)?;
        debug!(
            "looking up distribution for module '{top_level}' in {}",
            site_packages.display()
        );

        let entries = std::fs::read_dir(&site_packages).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !dir_name.ends_with(".dist-info") || !path.is_dir() {
                continue;
            }
            if dist_provides_module(&path, dir_name, &top_level) {
                if let Some(package) = read_dist_metadata(&path) {
                    return Some(package);
                }
            }
        }

        debug!("no distribution metadata found for module '{top_level}'");
        None
    }
}

/// Split a path inside a site-packages tree into the site-packages
/// directory and the top-level module name directly beneath it.
fn split_site_packages(module_path: &Path) -> Option<(PathBuf, String)> {
    for ancestor in module_path.ancestors().skip(1) {
        if ancestor.file_name().is_some_and(|n| n == "site-packages") {
            let relative = module_path.strip_prefix(ancestor).ok()?;
            let first = relative.components().next()?;
            let name = first.as_os_str().to_str()?;
            let name = name.strip_suffix(".py").unwrap_or(name);
            return Some((ancestor.to_path_buf(), name.to_owned()));
        }
    }
    None
}

/// Check whether a dist-info directory declares ownership of a top-level
/// module, either via its `top_level.txt` or by name comparison under
/// PEP 503 normalization.
fn dist_provides_module(dist_info: &Path, dir_name: &str, top_level: &str) -> bool {
    if let Ok(contents) = std::fs::read_to_string(dist_info.join("top_level.txt")) {
        return contents.lines().any(|line| line.trim() == top_level);
    }

    // No top_level.txt: fall back to comparing the distribution name
    // (the part of "name-version.dist-info" before the version) with the
    // module name, both normalized.
    let Some(dist_name) = dir_name
        .strip_suffix(".dist-info")
        .and_then(|stem| stem.split('-').next())
    else {
        return false;
    };
    match (
        PackageName::new(dist_name.to_owned()),
        PackageName::new(top_level.to_owned()),
    ) {
        (Ok(dist), Ok(module)) => dist == module,
        _ => false,
    }
}

/// Parse Name and Version out of a dist-info METADATA file.
fn read_dist_metadata(dist_info: &Path) -> Option<ThirdPartyPackage> {
    let contents = std::fs::read_to_string(dist_info.join("METADATA")).ok()?;

    let mut name = None;
    let mut version = None;
    for line in contents.lines() {
        // Headers end at the first blank line; the body may contain
        // anything, including lines that look like headers.
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Name: ") {
            name = Some(value.trim().to_owned());
        } else if let Some(value) = line.strip_prefix("Version: ") {
            version = Some(value.trim().to_owned());
        }
        if name.is_some() && version.is_some() {
            break;
        }
    }

    let name = PackageName::new(name?).ok()?;
    Some(ThirdPartyPackage {
        name: name.to_string(),
        version: version?,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use tempfile::TempDir;

    use super::*;

    fn write_dist_info(
        site_packages: &Path,
        dist_dir: &str,
        name: &str,
        version: &str,
        top_level: Option<&str>,
    ) -> Result<()> {
        let dist_info = site_packages.join(dist_dir);
        fs::create_dir_all(&dist_info)?;
        fs::write(
            dist_info.join("METADATA"),
            format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n\nBody text\n"),
        )?;
        if let Some(top_level) = top_level {
            fs::write(dist_info.join("top_level.txt"), format!("{top_level}\n"))?;
        }
        Ok(())
    }

    fn fake_site_packages(temp_dir: &TempDir) -> PathBuf {
        temp_dir
            .path()
            .join(".venv/lib/python3.11/site-packages")
    }

    #[test]
    fn test_resolve_via_top_level_txt() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let site_packages = fake_site_packages(&temp_dir);
        fs::create_dir_all(site_packages.join("yaml"))?;
        fs::write(site_packages.join("yaml/__init__.py"), "")?;
        write_dist_info(
            &site_packages,
            "PyYAML-6.0.1.dist-info",
            "PyYAML",
            "6.0.1",
            Some("yaml"),
        )?;

        let index = DistInfoIndex::new();
        let package = index
            .resolve(&site_packages.join("yaml/__init__.py"))
            .expect("yaml should map to PyYAML");
        // Name is PEP 503 normalized
        assert_eq!(package.name, "pyyaml");
        assert_eq!(package.version, "6.0.1");
        Ok(())
    }

    #[test]
    fn test_resolve_via_normalized_dist_name() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let site_packages = fake_site_packages(&temp_dir);
        fs::create_dir_all(site_packages.join("requests"))?;
        fs::write(site_packages.join("requests/__init__.py"), "")?;
        write_dist_info(
            &site_packages,
            "requests-2.31.0.dist-info",
            "requests",
            "2.31.0",
            None,
        )?;

        let index = DistInfoIndex::new();
        let package = index
            .resolve(&site_packages.join("requests/__init__.py"))
            .expect("requests should resolve");
        assert_eq!(package.to_string(), "requests==2.31.0");
        Ok(())
    }

    #[test]
    fn test_single_file_module() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let site_packages = fake_site_packages(&temp_dir);
        fs::create_dir_all(&site_packages)?;
        fs::write(site_packages.join("six.py"), "")?;
        write_dist_info(&site_packages, "six-1.16.0.dist-info", "six", "1.16.0", None)?;

        let index = DistInfoIndex::new();
        let package = index
            .resolve(&site_packages.join("six.py"))
            .expect("six should resolve");
        assert_eq!(package.to_string(), "six==1.16.0");
        Ok(())
    }

    #[test]
    fn test_miss_is_none_not_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let site_packages = fake_site_packages(&temp_dir);
        fs::create_dir_all(site_packages.join("orphan"))?;
        fs::write(site_packages.join("orphan/__init__.py"), "")?;

        let index = DistInfoIndex::new();
        assert!(
            index
                .resolve(&site_packages.join("orphan/__init__.py"))
                .is_none()
        );
        // Paths outside any site-packages never resolve
        assert!(index.resolve(temp_dir.path()).is_none());
        Ok(())
    }
}
