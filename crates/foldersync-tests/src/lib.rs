//! foldersync testing suite
//!
//! Shared fixtures for the integration tests: mirrored tree pairs, tree
//! snapshots for comparing source and replica, and a reporter that records
//! the order actions were reported in.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Common fixtures used across the integration tests to keep them short and
/// consistent.
pub mod test_utils;
