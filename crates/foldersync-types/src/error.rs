//! Error types and handling for foldersync
//!
//! Only [`Error::InvalidRoot`] is fatal to a synchronization pass. Every other
//! variant describes a problem with a single entry: the pass records it and
//! moves on to the next entry.

use crate::EntryKind;
use std::path::{Path, PathBuf};

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - entry skipped, nothing to fix
    Low,
    /// Medium severity - entry failed, likely transient or environmental
    Medium,
    /// High severity - needs operator attention
    High,
    /// Critical severity - the whole pass was aborted
    Critical,
}

/// Main error type for foldersync operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Source or replica root is missing or not a directory
    #[error("Invalid root '{path}': {reason}")]
    InvalidRoot {
        /// Offending root path
        path: PathBuf,
        /// Why the root was rejected
        reason: String,
    },

    /// Entry disappeared between enumeration and processing
    #[error("Entry vanished: {path}")]
    EntryVanished {
        /// Path of the vanished entry
        path: PathBuf,
    },

    /// Same relative path is a different kind of entry on each side
    #[error("Kind conflict at '{path}': {source_kind} in source, {replica_kind} in replica")]
    KindConflict {
        /// Replica-side path of the conflicting entry
        path: PathBuf,
        /// Kind found in the source tree
        source_kind: EntryKind,
        /// Kind found in the replica tree
        replica_kind: EntryKind,
    },

    /// Entry is neither a regular file nor a directory
    #[error("Unsupported entry kind: {path}")]
    UnsupportedEntryKind {
        /// Path of the unsupported entry
        path: PathBuf,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// Root missing or not a directory
    InvalidRoot,
    /// Entry vanished mid-pass
    EntryVanished,
    /// File on one side, directory on the other
    KindConflict,
    /// Symlink, device, socket or fifo
    UnsupportedEntryKind,
    /// I/O failure
    Io,
    /// Configuration errors
    Config,
    /// Cancellation
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidRoot => "invalid-root",
            Self::EntryVanished => "entry-vanished",
            Self::KindConflict => "kind-conflict",
            Self::UnsupportedEntryKind => "unsupported-entry-kind",
            Self::Io => "io-failure",
            Self::Config => "config",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRoot { .. } => ErrorKind::InvalidRoot,
            Self::EntryVanished { .. } => ErrorKind::EntryVanished,
            Self::KindConflict { .. } => ErrorKind::KindConflict,
            Self::UnsupportedEntryKind { .. } => ErrorKind::UnsupportedEntryKind,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidRoot { .. } => ErrorSeverity::Critical,
            Self::EntryVanished { .. } | Self::UnsupportedEntryKind { .. } => ErrorSeverity::Low,
            Self::KindConflict { .. } => ErrorSeverity::High,
            Self::Io { .. } => ErrorSeverity::Medium,
            Self::Config { .. } => ErrorSeverity::High,
            Self::Cancelled => ErrorSeverity::Low,
        }
    }

    /// Check if the pass can continue after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::EntryVanished { .. }
            | Self::KindConflict { .. }
            | Self::UnsupportedEntryKind { .. }
            | Self::Io { .. } => true,
            Self::InvalidRoot { .. } | Self::Config { .. } | Self::Cancelled => false,
        }
    }

    /// Whether this error is only worth a warning
    pub fn is_warning(&self) -> bool {
        self.severity() == ErrorSeverity::Low && self.is_recoverable()
    }

    /// Create a new invalid root error
    pub fn invalid_root<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::InvalidRoot {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a new entry vanished error
    pub fn vanished<P: AsRef<Path>>(path: P) -> Self {
        Self::EntryVanished {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a new unsupported entry kind error
    pub fn unsupported<P: AsRef<Path>>(path: P) -> Self {
        Self::UnsupportedEntryKind {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a new kind conflict error
    pub fn kind_conflict<P: AsRef<Path>>(
        path: P,
        source_kind: EntryKind,
        replica_kind: EntryKind,
    ) -> Self {
        Self::KindConflict {
            path: path.as_ref().to_path_buf(),
            source_kind,
            replica_kind,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify an I/O error raised while working on `path`.
    ///
    /// `NotFound` becomes [`Error::EntryVanished`]; everything else is an
    /// [`Error::Io`] whose message names the operation and the path.
    pub fn io_at<P: AsRef<Path>>(operation: &str, path: P, error: std::io::Error) -> Self {
        let path = path.as_ref();
        if error.kind() == std::io::ErrorKind::NotFound {
            return Self::vanished(path);
        }
        Self::Io {
            message: format!("Failed to {} '{}': {}", operation, path.display(), error),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
