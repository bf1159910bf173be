//! Structured builder for the Finder styling script.
//!
//! The layout is assembled as a value, validated, and only then serialized
//! to AppleScript, so a hostile or merely unlucky volume name cannot break
//! out of the script text.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::process::Cmd;

/// Upper bound for window/icon coordinates; anything larger is a config bug.
const MAX_COORD: u32 = 16_384;

/// Window and icon layout applied to the mounted volume.
#[derive(Debug, Clone)]
pub struct FinderLayout {
    /// Finder disk name (the mount point's final path segment).
    pub volume_name: String,
    /// Top-left screen position of the window.
    pub window_origin: (i32, i32),
    /// Window size in points; matches the background canvas.
    pub window_size: (u32, u32),
    /// Icon size in the window.
    pub icon_size: u32,
    /// Background picture, as a POSIX path inside the mounted volume.
    pub background: PathBuf,
    /// App bundle item name and icon center.
    pub app_item: (String, (u32, u32)),
    /// Applications alias item name and icon center.
    pub apps_item: (String, (u32, u32)),
    /// In-script delay before the final close, in seconds.
    pub delay_secs: u64,
}

impl FinderLayout {
    /// Reject values that cannot be represented safely in the script.
    pub fn validate(&self) -> Result<()> {
        for (what, value) in [
            ("volume name", self.volume_name.as_str()),
            ("app item name", self.app_item.0.as_str()),
            ("Applications item name", self.apps_item.0.as_str()),
        ] {
            if value.is_empty() {
                bail!("{what} is empty");
            }
            check_script_safe(what, value)?;
        }

        let background = self.background.to_string_lossy();
        if !self.background.is_absolute() {
            bail!("background path must be absolute: {background}");
        }
        check_script_safe("background path", &background)?;

        let (w, h) = self.window_size;
        if w == 0 || h == 0 || w > MAX_COORD || h > MAX_COORD {
            bail!("implausible window size {w}x{h}");
        }
        for (x, y) in [self.app_item.1, self.apps_item.1] {
            if x > MAX_COORD || y > MAX_COORD {
                bail!("implausible icon position ({x}, {y})");
            }
        }
        if self.icon_size == 0 || self.icon_size > 512 {
            bail!("implausible icon size {}", self.icon_size);
        }
        Ok(())
    }

    /// Serialize to the AppleScript program run against Finder.
    pub fn script(&self) -> String {
        let (ox, oy) = self.window_origin;
        let (w, h) = self.window_size;
        format!(
            r#"tell application "Finder"
    tell disk "{vol}"
        open
        set current view of container window to icon view
        set toolbar visible of container window to false
        set statusbar visible of container window to false
        set the bounds of container window to {{{ox}, {oy}, {right}, {bottom}}}
        set viewOptions to the icon view options of container window
        set arrangement of viewOptions to not arranged
        set icon size of viewOptions to {icon}
        set background picture of viewOptions to (POSIX file "{bg}") as alias
        set position of item "{app}" of container window to {{{app_x}, {app_y}}}
        set position of item "{apps}" of container window to {{{apps_x}, {apps_y}}}
        close
        open
        update without registering applications
        delay {delay}
        close
    end tell
end tell
"#,
            vol = self.volume_name,
            right = ox + w as i32,
            bottom = oy + h as i32,
            icon = self.icon_size,
            bg = self.background.display(),
            app = self.app_item.0,
            app_x = self.app_item.1 .0,
            app_y = self.app_item.1 .1,
            apps = self.apps_item.0,
            apps_x = self.apps_item.1 .0,
            apps_y = self.apps_item.1 .1,
            delay = self.delay_secs,
        )
    }

    /// Validate, then run the script through osascript. Styling is best
    /// effort: execution failure is logged as a warning and the build
    /// continues with an unstyled volume.
    pub fn apply(&self) -> Result<()> {
        self.validate()?;
        let script = self.script();

        match Cmd::new("osascript").arg("-e").arg(&script).allow_fail().run() {
            Ok(result) if result.success() => {
                println!("   Finder layout applied");
            }
            Ok(result) => {
                log::warn!(
                    "Finder styling failed (exit {}): {}",
                    result.code(),
                    result.stderr_trimmed()
                );
            }
            Err(err) => {
                log::warn!("Finder styling skipped: {err:#}");
            }
        }
        Ok(())
    }
}

fn check_script_safe(what: &str, value: &str) -> Result<()> {
    if value.contains('"') || value.contains('\\') {
        bail!("{what} contains a quote or backslash: {value}");
    }
    if value.chars().any(|c| c.is_control()) {
        bail!("{what} contains control characters");
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn layout() -> FinderLayout {
        FinderLayout {
            volume_name: "Noir".to_string(),
            window_origin: (200, 100),
            window_size: (700, 390),
            icon_size: 88,
            background: Path::new("/Volumes/Noir/.background/background.png").to_path_buf(),
            app_item: ("Noir.app".to_string(), (185, 170)),
            apps_item: ("Applications".to_string(), (515, 170)),
            delay_secs: 4,
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        layout().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_quoted_volume_name() {
        let mut bad = layout();
        bad.volume_name = "No\"ir".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_background() {
        let mut bad = layout();
        bad.background = PathBuf::from("background.png");
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut bad = layout();
        bad.window_size = (0, 390);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_control_chars() {
        let mut bad = layout();
        bad.app_item.0 = "Noir\n.app".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_script_contains_layout() {
        let script = layout().script();
        assert!(script.contains(r#"tell disk "Noir""#));
        assert!(script.contains("set the bounds of container window to {200, 100, 900, 490}"));
        assert!(script.contains("set icon size of viewOptions to 88"));
        assert!(script.contains(r#"set position of item "Noir.app" of container window to {185, 170}"#));
        assert!(script.contains(r#"set position of item "Applications" of container window to {515, 170}"#));
        assert!(script.contains("delay 4"));
        assert!(script.contains("update without registering applications"));
    }
}
