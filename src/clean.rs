//! Build artifact cleaning.

use anyhow::Result;
use std::fs;

use crate::config::Config;
use crate::dmg;

/// Remove the final DMG, its checksum, the intermediate writable image, and
/// the temporary background.
pub fn clean_outputs(config: &Config) -> Result<()> {
    let mut cleaned = false;

    if config.out_dmg.exists() {
        println!("Removing {}...", config.out_dmg.display());
        fs::remove_file(&config.out_dmg)?;
        cleaned = true;
    }

    let checksum = dmg::checksum_path(&config.out_dmg);
    if checksum.exists() {
        println!("Removing {}...", checksum.display());
        fs::remove_file(&checksum)?;
        cleaned = true;
    }

    if config.rw_image.exists() {
        println!("Removing writable image...");
        fs::remove_file(&config.rw_image)?;
        cleaned = true;
    }

    if config.background_png.exists() {
        println!("Removing background PNG...");
        fs::remove_file(&config.background_png)?;
        cleaned = true;
    }

    if cleaned {
        println!("Clean complete.");
    } else {
        println!("Nothing to clean.");
    }

    Ok(())
}
