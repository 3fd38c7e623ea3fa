//! Log sink setup
//!
//! Console output always goes to stderr so `--json` output on stdout stays
//! clean. An optional file sink receives the same lines without ANSI colors
//! through a non-blocking writer that drops lines instead of stalling a pass.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{fmt, EnvFilter};

/// Pick the log level: explicit flags win over the configured level
pub fn log_level<'a>(debug: bool, verbose: bool, quiet: bool, configured: &'a str) -> &'a str {
    if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "warn"
    } else {
        configured
    }
}

/// Install the global subscriber; keep the returned guard alive until exit
pub fn init_logging(
    level: &str,
    log_file: Option<&Path>,
    colored: bool,
) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{}'", level))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(colored)
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_appender(path)?);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Appending writer for `path`, creating its directory if needed
fn open_appender(path: &Path) -> Result<RollingFileAppender> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path '{}' has no file name", path.display()))?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory '{}'", directory.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .with_context(|| format!("Failed to open log file '{}'", path.display()))
}
