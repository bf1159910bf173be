//! Preflight checks for the DMG build.
//!
//! Validates host tools and inputs before starting a build. Run with
//! `noirdmg preflight` to check everything is ready.

use std::path::Path;

use crate::config::Config;
use crate::process;
use crate::typeset::FONT_CANDIDATES;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - build will fail.
    Fail,
    /// Check passed but with a warning.
    Warn,
}

impl CheckResult {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: None,
        }
    }

    fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }

    fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if all checks passed (no failures).
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    /// Count of failed checks.
    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    /// Count of warnings.
    pub fn warn_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Warn)
            .count()
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let icon = match check.status {
                CheckStatus::Pass => "✓",
                CheckStatus::Fail => "✗",
                CheckStatus::Warn => "⚠",
            };

            let status_str = match check.status {
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
                CheckStatus::Warn => "WARN",
            };

            print!("  {} [{}] {}", icon, status_str, check.name);
            if let Some(details) = &check.details {
                println!(": {}", details);
            } else {
                println!();
            }
        }

        println!();
        let total = self.checks.len();
        let passed = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Pass)
            .count();
        let failed = self.fail_count();
        let warned = self.warn_count();

        println!("Summary: {}/{} passed", passed, total);
        if failed > 0 {
            println!("         {} FAILED - build will not succeed", failed);
        }
        if warned > 0 {
            println!("         {} warnings", warned);
        }
    }
}

/// Run all preflight checks.
pub fn run_preflight(config: &Config) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.push(check_tool(
        "hdiutil",
        true,
        "Required to create, mount, and convert disk images",
    ));
    checks.push(check_tool(
        "osascript",
        false,
        "Required for Finder styling; without it the DMG ships unstyled",
    ));

    println!("Checking inputs...");
    checks.push(check_app_bundle(config));
    checks.push(check_fonts());
    checks.push(check_output_path(&config.out_dmg));

    println!();

    PreflightReport { checks }
}

fn check_tool(tool: &str, required: bool, purpose: &str) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path),
        None => {
            let msg = format!("Not found in PATH. {}", purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}

fn check_app_bundle(config: &Config) -> CheckResult {
    let bundle = &config.app_bundle;
    if !bundle.exists() {
        return CheckResult::fail(
            "app bundle",
            &format!(
                "{} not found. Build the app first, or set APP_BUNDLE.",
                bundle.display()
            ),
        );
    }
    if !config.has_app_bundle() {
        return CheckResult::warn(
            "app bundle",
            &format!("{} has no Contents/ directory", bundle.display()),
        );
    }
    CheckResult::pass_with("app bundle", &bundle.display().to_string())
}

fn check_fonts() -> CheckResult {
    match FONT_CANDIDATES.iter().find(|p| Path::new(p).exists()) {
        Some(found) => CheckResult::pass_with("background font", found),
        None => CheckResult::warn(
            "background font",
            "No probe font found; labels fall back to the system font database",
        ),
    }
}

fn check_output_path(out_dmg: &Path) -> CheckResult {
    match out_dmg.parent() {
        Some(parent) if parent.is_file() => CheckResult::fail(
            "output directory",
            &format!("{} exists and is a file", parent.display()),
        ),
        Some(parent) if parent.exists() => {
            CheckResult::pass_with("output directory", &parent.display().to_string())
        }
        Some(parent) => CheckResult::pass_with(
            "output directory",
            &format!("{} (will be created)", parent.display()),
        ),
        None => CheckResult::fail(
            "output directory",
            &format!("{} has no parent directory", out_dmg.display()),
        ),
    }
}

// =============================================================================
// Tests
// =============================================================================
