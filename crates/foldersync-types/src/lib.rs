//! Core type system and error handling for foldersync
//!
//! This crate provides the foundational types shared by the foldersync crates:
//!
//! - **Error handling**: the pass error taxonomy with kinds and severity levels
//! - **Core types**: entries, sync actions, pass statistics and per-entry failures
//! - **Traits**: the [`Reporter`] interface the synchronizer emits events through
//! - **Configuration**: validated configuration values
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use foldersync_types::{Result, SyncAction, SyncStats};
//!
//! fn example_operation() -> Result<SyncStats> {
//!     let mut stats = SyncStats::new();
//!     stats.record(&SyncAction::CreateDir { path: "replica/sub".into() }, 0);
//!     Ok(stats)
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{DirectoryPolicy, SyncInterval};
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use traits::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_stats_creation() {
        let stats = SyncStats::new();
        assert_eq!(stats.actions(), 0);
        assert_eq!(stats.bytes_copied, 0);
    }

    #[test]
    fn test_error_severity() {
        let io_error = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "test"));
        assert_eq!(io_error.severity(), ErrorSeverity::Medium);

        let config_error = Error::config("invalid config");
        assert_eq!(config_error.severity(), ErrorSeverity::High);
        assert!(!config_error.is_recoverable());
    }
}
