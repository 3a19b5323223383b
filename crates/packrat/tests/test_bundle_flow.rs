use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use packrat::{
    collector::DependencyCollector,
    config::Config,
    observer::{LoadedModule, ModuleProbe},
    resolver::ModuleResolver,
    types::ModuleKind,
};
use serial_test::serial;
use tempfile::TempDir;

struct FakeProbe {
    loaded: Vec<LoadedModule>,
}

impl ModuleProbe for FakeProbe {
    fn modules_loaded_by(&self, _tests_path: &Path) -> Result<Vec<LoadedModule>> {
        Ok(self.loaded.clone())
    }
}

fn create_test_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Lay down a fake installed distribution inside a site-packages tree.
fn install_fake_package(
    site_packages: &Path,
    module: &str,
    dist_name: &str,
    version: &str,
) -> Result<()> {
    create_test_file(&site_packages.join(module).join("__init__.py"), "")?;
    let dist_info = site_packages.join(format!("{dist_name}-{version}.dist-info"));
    fs::create_dir_all(&dist_info)?;
    fs::write(
        dist_info.join("METADATA"),
        format!("Metadata-Version: 2.1\nName: {dist_name}\nVersion: {version}\n\n"),
    )?;
    fs::write(dist_info.join("top_level.txt"), format!("{module}\n"))?;
    Ok(())
}

#[test]
fn test_end_to_end_bundle() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("project");
    let output = temp_dir.path().join("bundle");

    // Project: app.py -> lib package -> requests; lib carries a schema
    // file; lib/util.py is only exercised at runtime.
    create_test_file(&root.join("app.py"), "import os\nimport lib\n")?;
    create_test_file(&root.join("lib/__init__.py"), "import requests\n")?;
    create_test_file(&root.join("lib/util.py"), "import requests\n")?;
    create_test_file(&root.join("lib/schema.yaml"), "kind: schema\n")?;
    create_test_file(&root.join("tests/test_app.py"), "def test_ok():\n    pass\n")?;

    // Fake virtual environment with an installed requests distribution
    let venv = root.join(".venv");
    let site_packages = venv.join("lib/python3.11/site-packages");
    install_fake_package(&site_packages, "requests", "requests", "2.31.0")?;

    let collector = DependencyCollector::new(
        Config::default(),
        &root.join("app.py"),
        &root,
        Some(&output),
    )?;
    let resolver = ModuleResolver::new(
        Config::default(),
        root.canonicalize()?,
        root.join("app.py").canonicalize()?,
    )
    .with_pythonpath("")
    .with_virtualenv(&venv.to_string_lossy());
    let mut collector = collector.with_resolver(resolver);

    collector.collect_static()?;

    let probe = FakeProbe {
        loaded: vec![LoadedModule {
            name: "lib.util".to_owned(),
            path: Some(root.join("lib/util.py")),
        }],
    };
    collector.collect_runtime(&probe, &root.join("tests"))?;

    let summary = collector.assemble_bundle()?;
    assert_eq!(summary.code_files, 3, "app.py, lib/__init__.py, lib/util.py");
    assert_eq!(summary.config_files, 1, "lib/schema.yaml");
    assert_eq!(summary.packages, 1);

    // Output tree mirrors project-relative paths
    assert!(output.join("app.py").is_file());
    assert!(output.join("lib/__init__.py").is_file());
    assert!(output.join("lib/util.py").is_file());
    assert!(output.join("lib/schema.yaml").is_file());
    // The venv itself is never copied
    assert!(!output.join(".venv").exists());

    let manifest = fs::read_to_string(output.join("requirements.txt"))?;
    assert_eq!(manifest, "requests==2.31.0\n");
    Ok(())
}

#[test]
fn test_static_discovery_runs_without_probe() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("project");

    create_test_file(&root.join("app.py"), "import helper\n")?;
    create_test_file(&root.join("helper.py"), "import json\n")?;

    let collector = DependencyCollector::new(Config::default(), &root.join("app.py"), &root, None)?;
    let resolver = ModuleResolver::new(
        Config::default(),
        root.canonicalize()?,
        root.join("app.py").canonicalize()?,
    )
    .with_pythonpath("")
    .with_virtualenv("/nonexistent");
    let mut collector = collector.with_resolver(resolver);

    collector.collect_static()?;

    assert_eq!(collector.collected_files().len(), 2);
    assert!(collector.third_party_packages().is_empty());
    Ok(())
}

/// Restores VIRTUAL_ENV on drop so a panicking test cannot leak state.
struct VirtualEnvGuard {
    original_value: Option<String>,
}

impl VirtualEnvGuard {
    fn set(new_value: &str) -> Self {
        let original_value = std::env::var("VIRTUAL_ENV").ok();
        // SAFETY: tests touching VIRTUAL_ENV are serialized, and the guard
        // restores the original value on drop.
        unsafe {
            std::env::set_var("VIRTUAL_ENV", new_value);
        }
        Self { original_value }
    }
}

impl Drop for VirtualEnvGuard {
    fn drop(&mut self) {
        // SAFETY: restoring the environment to its original state
        unsafe {
            match self.original_value.take() {
                Some(original) => std::env::set_var("VIRTUAL_ENV", original),
                None => std::env::remove_var("VIRTUAL_ENV"),
            }
        }
    }
}

#[test]
#[serial]
fn test_virtual_env_variable_discovers_site_packages() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("project");
    create_test_file(&root.join("app.py"), "import colorette\n")?;

    // Venv lives outside the project root; only VIRTUAL_ENV points at it
    let venv = temp_dir.path().join("elsewhere/.venv");
    let site_packages = venv.join("lib/python3.11/site-packages");
    install_fake_package(&site_packages, "colorette", "colorette", "0.4.0")?;

    let _guard = VirtualEnvGuard::set(&venv.to_string_lossy());
    let mut resolver = ModuleResolver::new(
        Config::default(),
        root.canonicalize()?,
        root.join("app.py").canonicalize()?,
    )
    .with_pythonpath("");

    let reference = resolver
        .resolve("colorette")
        .expect("colorette should resolve through VIRTUAL_ENV");
    assert_eq!(reference.kind, ModuleKind::ThirdParty);
    assert!(
        resolver.third_party_packages().contains_key("colorette"),
        "package should be recorded for the manifest"
    );
    Ok(())
}

#[test]
fn test_config_extensions_respected_in_sweep() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("project");

    create_test_file(&root.join("app.py"), "")?;
    create_test_file(&root.join("settings.ini"), "[x]\n")?;
    create_test_file(&root.join("data.json"), "{}\n")?;

    let config = Config {
        config_extensions: ["ini".to_owned()].into_iter().collect(),
        ..Default::default()
    };
    let collector =
        DependencyCollector::new(config.clone(), &root.join("app.py"), &root, None)?;
    let resolver = ModuleResolver::new(
        config,
        root.canonicalize()?,
        root.join("app.py").canonicalize()?,
    )
    .with_pythonpath("")
    .with_virtualenv("/nonexistent");
    let mut collector = collector.with_resolver(resolver);

    collector.collect_static()?;

    let collected: Vec<PathBuf> = collector.collected_files().iter().cloned().collect();
    assert!(collected.iter().any(|p| p.ends_with("settings.ini")));
    assert!(!collected.iter().any(|p| p.ends_with("data.json")));
    Ok(())
}
