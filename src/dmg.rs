//! DMG assembly: staging, image creation, Finder styling, conversion.
//!
//! The staging directory is a [`tempfile::TempDir`], so it is removed on
//! every exit path, including mid-pipeline failures.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::config::Config;
use crate::finder::FinderLayout;
use crate::hdiutil::DiskImageBackend;

/// Outcome of a successful build.
#[derive(Debug)]
pub struct BuildSummary {
    pub output: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

impl BuildSummary {
    pub fn print(&self) {
        println!("\nDMG written: {}", self.output.display());
        println!("  Size: {:.1} MB", self.size_bytes as f64 / 1_048_576.0);
        println!("  SHA-256: {}", self.sha256);
    }
}

/// Assemble the final compressed image from the app bundle and the
/// pre-rendered background.
pub fn build(
    config: &Config,
    backend: &dyn DiskImageBackend,
    background: &Path,
) -> Result<BuildSummary> {
    if !config.app_bundle.exists() {
        bail!("app bundle not found: {}", config.app_bundle.display());
    }

    println!("Staging volume contents...");
    let staging = tempfile::Builder::new()
        .prefix("noir_dmg_")
        .tempdir()
        .context("failed to create staging directory")?;
    stage(config, staging.path(), background)?;

    println!("Creating writable image...");
    if config.rw_image.exists() {
        fs::remove_file(&config.rw_image)
            .with_context(|| format!("failed to remove stale {}", config.rw_image.display()))?;
    }
    backend.create(&config.volume_name, staging.path(), &config.rw_image)?;

    println!("Mounting writable image...");
    let mount_point = backend.attach(&config.rw_image)?;
    println!("  Mounted at {}", mount_point.display());

    style_volume(config, &mount_point);

    // Give Finder a moment to flush .DS_Store before the volume goes away.
    thread::sleep(Duration::from_secs(config.settle_delay_secs));
    println!("Detaching...");
    backend.detach(&mount_point)?;

    println!("Converting to compressed image...");
    if let Some(parent) = config.out_dmg.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if config.out_dmg.exists() {
        fs::remove_file(&config.out_dmg)
            .with_context(|| format!("failed to remove old {}", config.out_dmg.display()))?;
    }
    backend.convert(&config.rw_image, &config.out_dmg)?;

    if let Err(err) = fs::remove_file(&config.rw_image) {
        log::warn!(
            "could not remove intermediate {}: {err}",
            config.rw_image.display()
        );
    }

    let summary = summarize(&config.out_dmg)?;
    write_checksum(&summary)?;
    Ok(summary)
}

/// Mirror the intended volume contents into the staging directory.
fn stage(config: &Config, staging: &Path, background: &Path) -> Result<()> {
    let bundle_name = config
        .app_bundle
        .file_name()
        .context("app bundle path has no file name")?;
    copy_tree(&config.app_bundle, &staging.join(bundle_name))?;

    // Finder resolves this to the real /Applications once the volume mounts.
    symlink("/Applications", staging.join("Applications"))
        .context("failed to create Applications symlink")?;

    let bg_dir = staging.join(".background");
    fs::create_dir_all(&bg_dir)?;
    fs::copy(background, bg_dir.join("background.png"))
        .with_context(|| format!("failed to copy background {}", background.display()))?;

    Ok(())
}

/// Recursive copy preserving symlinks; app bundles link framework versions
/// internally and must keep doing so inside the volume.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            symlink(&link, &target)
                .with_context(|| format!("failed to link {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Best-effort Finder window styling on the mounted volume.
fn style_volume(config: &Config, mount_point: &Path) {
    // The window title comes from the actual mount point, which macOS may
    // have suffixed (e.g. "Noir 1") if a same-named volume was already up.
    let disk_name = mount_point
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.volume_name.clone());

    let bundle_name = config
        .app_bundle
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Noir.app".to_string());

    println!("Styling Finder window...");
    let layout = FinderLayout {
        volume_name: disk_name,
        window_origin: config.window_origin,
        window_size: (config.win_w, config.win_h),
        icon_size: config.icon_size,
        background: mount_point.join(".background").join("background.png"),
        app_item: (bundle_name, config.app_icon),
        apps_item: ("Applications".to_string(), config.apps_icon),
        delay_secs: config.finder_delay_secs,
    };
    if let Err(err) = layout.apply() {
        log::warn!("Finder styling skipped: {err:#}");
    }
}

fn summarize(output: &Path) -> Result<BuildSummary> {
    let metadata = fs::metadata(output)
        .with_context(|| format!("missing output image {}", output.display()))?;

    let mut hasher = Sha256::new();
    let mut file = fs::File::open(output)
        .with_context(|| format!("failed to open {}", output.display()))?;
    io::copy(&mut file, &mut hasher)?;

    Ok(BuildSummary {
        output: output.to_path_buf(),
        size_bytes: metadata.len(),
        sha256: format!("{:x}", hasher.finalize()),
    })
}

/// Checksum file path next to the output image.
pub fn checksum_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

fn write_checksum(summary: &BuildSummary) -> Result<()> {
    let path = checksum_path(&summary.output);
    let name = summary
        .output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    fs::write(&path, format!("{}  {}\n", summary.sha256, name))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
