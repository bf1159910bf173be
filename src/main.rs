//! noirdmg - Noir DMG installer builder.
//!
//! Packages the built Noir.app bundle into a styled, compressed DMG:
//! - generated window background (glow, grain, drag arrow, labels)
//! - app bundle + /Applications alias with fixed icon layout
//! - UDRW scratch image styled via Finder, converted to UDZO

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use noirdmg::background;
use noirdmg::clean;
use noirdmg::config::Config;
use noirdmg::dmg;
use noirdmg::hdiutil::Hdiutil;
use noirdmg::preflight;
use noirdmg::timing::Timer;

#[derive(Parser)]
#[command(name = "noirdmg")]
#[command(about = "Noir DMG installer builder")]
#[command(
    after_help = "QUICK START:\n  noirdmg preflight  Check host tools and inputs\n  noirdmg build      Build the styled DMG\n  noirdmg clean      Remove build artifacts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the styled DMG (background + disk image)
    Build,

    /// Generate only the background image and print its path
    Background,

    /// Run preflight checks (host tools, inputs)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Clean build artifacts (DMG, checksum, intermediates)
    Clean,

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let base_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load(&base_dir);

    match cli.command {
        Commands::Build => cmd_build(&config)?,

        Commands::Background => {
            let path = background::generate(&config)?;
            println!("{}", path.display());
        }

        Commands::Preflight { strict } => {
            let report = preflight::run_preflight(&config);
            report.print();
            if strict && !report.all_passed() {
                bail!("preflight failed ({} checks)", report.fail_count());
            }
        }

        Commands::Clean => clean::clean_outputs(&config)?,

        Commands::Show { what } => match what {
            ShowTarget::Config { json } => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    config.print();
                }
            }
        },
    }

    Ok(())
}

fn cmd_build(config: &Config) -> Result<()> {
    // Checked here, before the synthesizer runs: a missing bundle must stop
    // the build before any side effect.
    if !config.app_bundle.exists() {
        bail!(
            "app bundle not found: {}\nBuild the app first (cargo tauri build), or set APP_BUNDLE.",
            config.app_bundle.display()
        );
    }

    let timer = Timer::start("background");
    let bg = background::generate(config)?;
    timer.finish();

    let timer = Timer::start("dmg assembly");
    let summary = dmg::build(config, &Hdiutil, &bg)?;
    timer.finish();

    summary.print();
    Ok(())
}
