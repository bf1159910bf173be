//! Shared test utilities for noirdmg tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::env;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use noirdmg::config::Config;
use noirdmg::hdiutil::DiskImageBackend;

/// Test environment: a temporary base directory holding a mock app bundle
/// and redirected output/intermediate paths.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Base directory (project root simulation)
    pub base_dir: PathBuf,
}

impl TestEnv {
    /// Create a new test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_dir,
        }
    }

    /// Config whose every path points inside the test directory, with the
    /// wait delays zeroed so tests do not sleep.
    pub fn config(&self) -> Config {
        let mut config = Config::load(&self.base_dir);
        config.app_bundle = self.base_dir.join("Noir.app");
        config.out_dmg = self.base_dir.join("out/Noir_test.dmg");
        config.rw_image = self.base_dir.join("noir_rw.dmg");
        config.background_png = self.base_dir.join("background.png");
        config.volume_name = "Noir".to_string();
        config.settle_delay_secs = 0;
        config.finder_delay_secs = 0;
        config
    }
}

/// Create a minimal mock .app bundle with the usual structure, including an
/// internal symlink like real bundles carry in Frameworks.
pub fn create_mock_bundle(path: &Path) {
    fs::create_dir_all(path.join("Contents/MacOS")).expect("Failed to create bundle dirs");
    fs::create_dir_all(path.join("Contents/Resources")).expect("Failed to create bundle dirs");
    fs::write(
        path.join("Contents/Info.plist"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleName</key>
	<string>Noir</string>
	<key>CFBundleShortVersionString</key>
	<string>0.1.0</string>
</dict>
</plist>
"#,
    )
    .expect("Failed to write Info.plist");
    fs::write(path.join("Contents/MacOS/Noir"), b"#!/bin/sh\nexit 0\n")
        .expect("Failed to write mock binary");
    symlink("MacOS/Noir", path.join("Contents/Launcher")).expect("Failed to create bundle symlink");
}

/// Run `f` with TMPDIR pointed at `dir`, restoring it afterwards, so staging
/// directories land somewhere the test can inspect.
pub fn with_tmpdir<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
    let old = env::var_os("TMPDIR");
    env::set_var("TMPDIR", dir);
    let result = f();
    match old {
        Some(value) => env::set_var("TMPDIR", value),
        None => env::remove_var("TMPDIR"),
    }
    result
}

/// Any staging directories left under `dir`.
pub fn staging_leftovers(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .expect("Failed to read dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with("noir_dmg_"))
                .unwrap_or(false)
        })
        .collect()
}

/// Fake disk-image backend: records calls, simulates hdiutil with plain
/// filesystem operations, and can fail at a chosen step.
#[derive(Default)]
pub struct FakeBackend {
    calls: RefCell<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that fails with an error when the named step runs.
    pub fn failing_at(step: &'static str) -> Self {
        Self {
            fail_on: Some(step),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, step: &str) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(step.to_string());
        if self.fail_on == Some(step) {
            anyhow::bail!("{step} failed (injected)");
        }
        Ok(())
    }
}

impl DiskImageBackend for FakeBackend {
    fn create(&self, volume_name: &str, src_folder: &Path, image: &Path) -> anyhow::Result<()> {
        self.record("create")?;
        // The staging tree must be complete by the time create runs.
        assert!(src_folder.join("Noir.app/Contents").is_dir());
        assert!(src_folder
            .join("Applications")
            .symlink_metadata()
            .expect("Applications alias must be staged")
            .file_type()
            .is_symlink());
        assert!(src_folder.join(".background/background.png").is_file());
        fs::write(image, format!("UDRW:{volume_name}")).expect("Failed to write rw image");
        Ok(())
    }

    fn attach(&self, image: &Path) -> anyhow::Result<PathBuf> {
        self.record("attach")?;
        let mount = image
            .parent()
            .expect("image path has a parent")
            .join("Volumes")
            .join("Noir");
        fs::create_dir_all(&mount).expect("Failed to create mount dir");
        Ok(mount)
    }

    fn detach(&self, mount_point: &Path) -> anyhow::Result<()> {
        self.record("detach")?;
        fs::remove_dir_all(mount_point).ok();
        Ok(())
    }

    fn convert(&self, image: &Path, out: &Path) -> anyhow::Result<()> {
        self.record("convert")?;
        let payload = fs::read(image).expect("rw image must exist at convert time");
        let mut compressed = b"UDZO:".to_vec();
        compressed.extend_from_slice(&payload);
        fs::write(out, compressed).expect("Failed to write output image");
        Ok(())
    }
}
