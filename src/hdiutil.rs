//! Thin capability layer over the macOS disk image tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::process::Cmd;

/// The four disk-image operations the assembler needs. Narrow on purpose:
/// tests drive the assembler against a fake implementation.
pub trait DiskImageBackend {
    /// Create a writable (UDRW) image from a staged directory tree.
    fn create(&self, volume_name: &str, src_folder: &Path, image: &Path) -> Result<()>;
    /// Attach the image read-write without auto-opening; returns the mount
    /// point.
    fn attach(&self, image: &Path) -> Result<PathBuf>;
    /// Force-detach a mounted volume.
    fn detach(&self, mount_point: &Path) -> Result<()>;
    /// Convert a writable image to compressed read-only (UDZO) output.
    fn convert(&self, image: &Path, out: &Path) -> Result<()>;
}

/// Real backend shelling out to `hdiutil`.
pub struct Hdiutil;

impl DiskImageBackend for Hdiutil {
    fn create(&self, volume_name: &str, src_folder: &Path, image: &Path) -> Result<()> {
        Cmd::new("hdiutil")
            .args(["create", "-volname", volume_name, "-srcfolder"])
            .arg_path(src_folder)
            .args(["-ov", "-format", "UDRW"])
            .arg_path(image)
            .error_msg("hdiutil create failed")
            .run()?;
        Ok(())
    }

    fn attach(&self, image: &Path) -> Result<PathBuf> {
        let result = Cmd::new("hdiutil")
            .arg("attach")
            .arg_path(image)
            .args(["-readwrite", "-noverify", "-noautoopen"])
            .error_msg("hdiutil attach failed")
            .run()?;

        parse_mount_point(&result.stdout).with_context(|| {
            format!(
                "no mount point in hdiutil attach output:\n{}",
                result.stdout_trimmed()
            )
        })
    }

    fn detach(&self, mount_point: &Path) -> Result<()> {
        Cmd::new("hdiutil")
            .arg("detach")
            .arg_path(mount_point)
            .arg("-force")
            .error_msg("hdiutil detach failed")
            .run()?;
        Ok(())
    }

    fn convert(&self, image: &Path, out: &Path) -> Result<()> {
        Cmd::new("hdiutil")
            .arg("convert")
            .arg_path(image)
            .args(["-format", "UDZO", "-imagekey", "zlib-level=9", "-o"])
            .arg_path(out)
            .error_msg("hdiutil convert failed")
            .run()?;
        Ok(())
    }
}

/// Locate the mount point in `hdiutil attach` output: the line mentioning
/// the volumes root, last tab-separated field.
pub fn parse_mount_point(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .find(|line| line.contains("/Volumes/"))
        .and_then(|line| line.rsplit('\t').next())
        .map(|field| PathBuf::from(field.trim()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mount_point_typical_output() {
        let stdout = "/dev/disk4          \tGUID_partition_scheme          \t\n\
                      /dev/disk4s1        \tApple_HFS                      \t/Volumes/Noir\n";
        assert_eq!(
            parse_mount_point(stdout),
            Some(PathBuf::from("/Volumes/Noir"))
        );
    }

    #[test]
    fn test_parse_mount_point_name_with_spaces() {
        let stdout = "/dev/disk5s1\tApple_HFS\t/Volumes/Noir 1\n";
        assert_eq!(
            parse_mount_point(stdout),
            Some(PathBuf::from("/Volumes/Noir 1"))
        );
    }

    #[test]
    fn test_parse_mount_point_missing() {
        let stdout = "/dev/disk4\tGUID_partition_scheme\t\n";
        assert_eq!(parse_mount_point(stdout), None);
    }

    #[test]
    fn test_parse_mount_point_empty() {
        assert_eq!(parse_mount_point(""), None);
    }
}
