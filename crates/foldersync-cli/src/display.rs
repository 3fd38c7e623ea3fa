//! Display utilities for the foldersync CLI

use console::style;
use foldersync_sync::{SyncResult, VerifyReport};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Pass result wrapped with tool metadata, for `--json`
#[derive(Debug, Serialize)]
pub struct PassReportJson<'a> {
    /// foldersync version
    pub version: &'static str,
    /// Whether the pass completed without failures
    pub succeeded: bool,
    /// The pass itself
    pub result: &'a SyncResult,
}

impl<'a> PassReportJson<'a> {
    /// Wrap a pass result
    pub fn new(result: &'a SyncResult) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            succeeded: pass_succeeded(result),
            result,
        }
    }
}

/// A pass succeeded when it finished and nothing failed; skipped entries are fine
pub fn pass_succeeded(result: &SyncResult) -> bool {
    !result.cancelled && result.failures().next().is_none()
}

/// Spinner for long-running work, hidden in quiet mode
pub fn create_spinner(quiet: bool, message: &str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Print the banner shown before work starts
pub fn print_banner(symbol: &str, action: &str, source: &Path, replica: &Path) {
    println!(
        "{} {} {} to {}",
        style(symbol).blue().bold(),
        action,
        style(source.display()).cyan(),
        style(replica.display()).cyan()
    );
}

/// Print pass statistics and any failures
pub fn print_sync_result(result: &SyncResult) {
    let stats = &result.stats;

    println!();
    let title = if result.dry_run {
        "Sync Statistics (dry run):"
    } else {
        "Sync Statistics:"
    };
    println!("{}", style(title).bold().underlined());
    println!("  Entries scanned: {}", style(result.items_scanned).cyan());
    println!(
        "  Directories created: {}",
        style(stats.directories_created).green()
    );
    println!("  Files copied: {}", style(stats.files_copied).green());
    println!("  Files updated: {}", style(stats.files_updated).green());
    if stats.directories_replaced > 0 {
        println!(
            "  Directories replaced: {}",
            style(stats.directories_replaced).green()
        );
    }
    println!("  Files deleted: {}", style(stats.files_deleted).yellow());
    println!(
        "  Directories deleted: {}",
        style(stats.directories_deleted).yellow()
    );
    println!(
        "  Bytes copied: {}",
        style(format_bytes(stats.bytes_copied)).green()
    );

    let warnings = result.warnings().count();
    let failures = result.failures().count();
    println!("  Skipped: {}", style(warnings).yellow());
    println!(
        "  Errors: {}",
        if failures > 0 {
            style(failures).red()
        } else {
            style(failures).green()
        }
    );
    println!(
        "  Duration: {}",
        style(format_duration(result.duration)).blue()
    );

    if !result.errors.is_empty() {
        println!();
        for failure in &result.errors {
            let marker = if failure.is_warning() {
                style("!").yellow()
            } else {
                style("✗").red()
            };
            println!("  {} {}", marker, failure);
        }
    }

    if result.cancelled {
        println!();
        println!("{} Pass was cancelled before it finished", style("ℹ").yellow());
    }
}

/// Print the outcome of a fingerprint comparison
pub fn print_verify_report(report: &VerifyReport) {
    println!("  Source:  {}", style(report.source).dim());
    println!("  Replica: {}", style(report.replica).dim());
    if report.in_sync() {
        println!("{} Replica matches source", style("✓").green().bold());
    } else {
        println!("{} Replica differs from source", style("✗").red().bold());
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Human-readable duration
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
