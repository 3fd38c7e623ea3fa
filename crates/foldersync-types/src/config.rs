//! Configuration types for foldersync
//!
//! Type-safe configuration values with validation and serialization support.

use std::time::Duration;

/// Interval between two synchronization passes, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncInterval(u64);

impl SyncInterval {
    /// Minimum interval (1 second)
    pub const MIN: u64 = 1;
    /// Default interval (60 seconds)
    pub const DEFAULT: u64 = 60;

    /// Create a new interval with validation
    pub fn new(seconds: u64) -> Result<Self, String> {
        if seconds < Self::MIN {
            Err(format!(
                "Sync interval must be a positive number of seconds, got {}",
                seconds
            ))
        } else {
            Ok(Self(seconds))
        }
    }

    /// Get the interval in seconds
    pub fn as_secs(self) -> u64 {
        self.0
    }

    /// Get the interval as a duration
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for SyncInterval {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// How a replica directory that already exists is brought up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DirectoryPolicy {
    /// Compare children one by one and touch only what changed
    #[default]
    Merge,
    /// Compare directory fingerprints and replace the whole subtree on mismatch
    Replace,
}

impl std::str::FromStr for DirectoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!("Unknown directory policy: {}", other)),
        }
    }
}
