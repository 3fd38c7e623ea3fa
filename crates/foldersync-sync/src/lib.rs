//! One-way directory mirroring for foldersync
//!
//! This crate keeps a replica directory tree identical to a source tree:
//!
//! - **Fingerprinting**: BLAKE3 content digests for files and whole directory trees
//! - **Change detection**: content, not timestamps or sizes, decides what is stale
//! - **Two-phase passes**: creations and updates first, then deletions
//! - **Fingerprint caching**: optional reuse of file digests across passes
//! - **Reporting**: every action and skipped entry goes through a [`Reporter`]
//! - **Scheduling**: [`PeriodicSync`] repeats passes on an interval until cancelled
//!
//! # Examples
//!
//! ```rust
//! use foldersync_sync::{Synchronizer, SyncOptions, TracingReporter};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut synchronizer = Synchronizer::with_options(SyncOptions::cached());
//! let result = synchronizer
//!     .synchronize(Path::new("source"), Path::new("replica"), &TracingReporter)
//!     .await?;
//! println!("{} actions, {} bytes copied", result.actions_applied(), result.stats.bytes_copied);
//! # Ok(())
//! # }
//! ```
//!
//! [`Reporter`]: foldersync_types::Reporter

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod engine;
pub mod fingerprint;
pub mod reporter;
pub mod scheduler;

pub use cache::{CacheEntry, CacheStats, FingerprintCache};
pub use engine::{synchronize, verify, SyncOptions, SyncResult, Synchronizer, VerifyReport};
pub use fingerprint::{fingerprint, hash_file, Fingerprint, Fingerprinter, CHUNK_SIZE};
pub use reporter::{MemoryReporter, NullReporter, ReportedEvent, TracingReporter};
pub use scheduler::PeriodicSync;
