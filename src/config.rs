//! Configuration management for noirdmg.
//!
//! Reads configuration from a .env file in the base directory and from
//! environment variables. Environment variables take precedence over the
//! .env file; everything has a default so a plain `noirdmg build` works
//! from the repository root.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// noirdmg configuration. One instance is loaded at startup and passed into
/// both the background synthesizer and the DMG assembler.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Built app bundle to package (APP_BUNDLE).
    pub app_bundle: PathBuf,
    /// Source icon image (ICON_PNG). Accepted and shown but not consumed by
    /// the current pipeline.
    pub icon_png: PathBuf,
    /// Final compressed DMG (OUT_DMG).
    pub out_dmg: PathBuf,
    /// Volume name (VOL_NAME); defaults to the app bundle's file stem.
    pub volume_name: String,
    /// Finder window / background canvas size in points (WIN_W, WIN_H).
    /// Kept at 1x so Finder shows the PNG at its real point size.
    pub win_w: u32,
    pub win_h: u32,
    /// Icon centers in window points (APP_ICON_X/Y, APPS_ICON_X/Y).
    pub app_icon: (u32, u32),
    pub apps_icon: (u32, u32),
    /// Finder icon size (ICON_SIZE).
    pub icon_size: u32,
    /// Screen offset of the Finder window (WINDOW_ORIGIN_X/Y).
    pub window_origin: (i32, i32),
    /// Delay inside the Finder script before the final close, in seconds
    /// (FINDER_DELAY). Covers the window-update animation; there is no
    /// completion signal to poll instead.
    pub finder_delay_secs: u64,
    /// Pause before detaching the volume, in seconds (SETTLE_DELAY).
    pub settle_delay_secs: u64,
    /// Version label drawn on the background (VERSION_LABEL). When unset it
    /// is derived from the bundle's Info.plist.
    version_label: Option<String>,
    /// Temporary background PNG path.
    pub background_png: PathBuf,
    /// Intermediate writable image path, removed after conversion.
    pub rw_image: PathBuf,
}

impl Config {
    /// Load configuration from the base directory's .env file and the
    /// process environment.
    pub fn load(base_dir: &Path) -> Self {
        let mut env_vars = HashMap::new();

        // Try to load .env file
        let env_path = base_dir.join(".env");
        if env_path.exists() {
            if let Ok(content) = fs::read_to_string(&env_path) {
                for line in content.lines() {
                    let line = line.trim();
                    // Skip comments and empty lines
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    // Parse KEY=value
                    if let Some((key, value)) = line.split_once('=') {
                        let key = key.trim();
                        let value = value.trim();
                        // Remove quotes if present
                        let value = value.trim_matches('"').trim_matches('\'');
                        env_vars.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        // Environment variables override .env file
        for (key, value) in env::vars() {
            env_vars.insert(key, value);
        }

        let app_bundle = path_from(base_dir, &env_vars, "APP_BUNDLE")
            .unwrap_or_else(|| base_dir.join("target/release/bundle/macos/Noir.app"));

        let icon_png = path_from(base_dir, &env_vars, "ICON_PNG")
            .unwrap_or_else(|| base_dir.join("icons/256.png"));

        let out_dmg = path_from(base_dir, &env_vars, "OUT_DMG")
            .unwrap_or_else(|| base_dir.join("target/release/bundle/dmg/Noir_0.1.0_aarch64.dmg"));

        let volume_name = env_vars.get("VOL_NAME").cloned().unwrap_or_else(|| {
            app_bundle
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Noir".to_string())
        });

        Self {
            app_bundle,
            icon_png,
            out_dmg,
            volume_name,
            win_w: num_from(&env_vars, "WIN_W", 700),
            win_h: num_from(&env_vars, "WIN_H", 390),
            app_icon: (
                num_from(&env_vars, "APP_ICON_X", 185),
                num_from(&env_vars, "APP_ICON_Y", 170),
            ),
            apps_icon: (
                num_from(&env_vars, "APPS_ICON_X", 515),
                num_from(&env_vars, "APPS_ICON_Y", 170),
            ),
            icon_size: num_from(&env_vars, "ICON_SIZE", 88),
            window_origin: (
                num_from(&env_vars, "WINDOW_ORIGIN_X", 200),
                num_from(&env_vars, "WINDOW_ORIGIN_Y", 100),
            ),
            finder_delay_secs: num_from(&env_vars, "FINDER_DELAY", 4),
            settle_delay_secs: num_from(&env_vars, "SETTLE_DELAY", 2),
            version_label: env_vars.get("VERSION_LABEL").cloned(),
            background_png: env::temp_dir().join("noir_dmg_background.png"),
            rw_image: env::temp_dir().join("noir_rw.dmg"),
        }
    }

    /// Version label for the background: explicit VERSION_LABEL, then the
    /// bundle's CFBundleShortVersionString, then the historical literal.
    pub fn version_label(&self) -> String {
        if let Some(label) = &self.version_label {
            return label.clone();
        }
        match bundle_short_version(&self.app_bundle) {
            Some(version) => format!("v{version}"),
            None => "v0.1.0 beta".to_string(),
        }
    }

    /// Check if the app bundle looks like an actual bundle.
    pub fn has_app_bundle(&self) -> bool {
        self.app_bundle.join("Contents").is_dir()
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  APP_BUNDLE: {}", self.app_bundle.display());
        println!("  ICON_PNG: {} (reserved)", self.icon_png.display());
        println!("  OUT_DMG: {}", self.out_dmg.display());
        println!("  VOL_NAME: {}", self.volume_name);
        println!(
            "  Window: {}x{} at ({}, {})",
            self.win_w, self.win_h, self.window_origin.0, self.window_origin.1
        );
        println!(
            "  Icons: app ({}, {}), Applications ({}, {}), size {}",
            self.app_icon.0, self.app_icon.1, self.apps_icon.0, self.apps_icon.1, self.icon_size
        );
        println!(
            "  Delays: finder {}s, settle {}s",
            self.finder_delay_secs, self.settle_delay_secs
        );
        println!("  Version label: {}", self.version_label());
        println!("  Background PNG: {}", self.background_png.display());
        println!("  Writable image: {}", self.rw_image.display());
        if self.app_bundle.exists() {
            println!("  App bundle: FOUND");
        } else {
            println!("  App bundle: NOT FOUND (build the app first, or set APP_BUNDLE)");
        }
    }
}

/// Expand `~/` against the home directory; resolve relative paths against
/// the base directory.
pub fn expand_path(base_dir: &Path, value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn path_from(base_dir: &Path, env_vars: &HashMap<String, String>, key: &str) -> Option<PathBuf> {
    env_vars.get(key).map(|value| expand_path(base_dir, value))
}

fn num_from<T>(env_vars: &HashMap<String, String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    let Some(raw) = env_vars.get(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            log::warn!("ignoring invalid {key}={raw}");
            default
        }
    }
}

fn bundle_short_version(bundle: &Path) -> Option<String> {
    let info = bundle.join("Contents/Info.plist");
    let value = plist::Value::from_file(info).ok()?;
    value
        .as_dictionary()?
        .get("CFBundleShortVersionString")?
        .as_string()
        .map(|s| s.to_string())
}
