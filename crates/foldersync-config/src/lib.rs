//! Configuration management for foldersync
//!
//! Configuration is layered: built-in defaults, then an optional file (YAML,
//! TOML or JSON, picked by extension), then `FOLDERSYNC__SECTION__KEY`
//! environment variables. Command-line flags are applied on top by the binary.
//!
//! # Examples
//!
//! ```rust
//! use foldersync_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("foldersync.yaml")
//!     .add_env_prefix("FOLDERSYNC")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Interval: {}s", config.sync.interval_secs);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use foldersync_types::{DirectoryPolicy, SyncInterval};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Log levels accepted in `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for foldersync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// What to mirror and how
    #[serde(default)]
    pub sync: SyncConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Synchronization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Source root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Replica root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica: Option<PathBuf>,
    /// Seconds between passes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Report actions without applying them
    #[serde(default)]
    pub dry_run: bool,
    /// How existing replica directories are updated
    #[serde(default)]
    pub directory_policy: DirectoryPolicy,
    /// Reuse file fingerprints across passes
    #[serde(default)]
    pub cache_fingerprints: bool,
    /// Copy modification times onto replica files
    #[serde(default = "default_true")]
    pub preserve_timestamps: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: None,
            replica: None,
            interval_secs: SyncInterval::DEFAULT,
            dry_run: false,
            directory_policy: DirectoryPolicy::Merge,
            cache_fingerprints: false,
            preserve_timestamps: true,
        }
    }
}

impl SyncConfig {
    /// The validated interval
    pub fn interval(&self) -> ConfigResult<SyncInterval> {
        SyncInterval::new(self.interval_secs)
            .map_err(|message| ConfigError::invalid_value("sync.interval_secs", message))
    }

    /// Check interval and roots; roots are only compared when both are set
    pub fn validate(&self) -> ConfigResult<()> {
        self.interval()?;

        if let (Some(source), Some(replica)) = (&self.source, &self.replica) {
            if roots_overlap(source, replica) {
                return Err(ConfigError::validation(format!(
                    "Source '{}' and replica '{}' must be separate trees",
                    source.display(),
                    replica.display()
                )));
            }
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_level")]
    pub level: String,
    /// Also append log lines to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Enable colored console output
    #[serde(default = "default_true")]
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_file: None,
            colored_output: true,
        }
    }
}

impl Config {
    /// Validate every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.sync.validate()?;

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::validation(
                "Log level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

fn default_interval_secs() -> u64 {
    SyncInterval::DEFAULT
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Whether one root equals or contains the other
///
/// Paths are compared as written and, when both exist, again after resolving
/// symlinks and `..`.
pub fn roots_overlap(source: &Path, replica: &Path) -> bool {
    let nested = |a: &Path, b: &Path| a.starts_with(b) || b.starts_with(a);
    if nested(source, replica) {
        return true;
    }
    match (std::fs::canonicalize(source), std::fs::canonicalize(replica)) {
        (Ok(source), Ok(replica)) => nested(&source, &replica),
        _ => false,
    }
}
