//! Core data types for foldersync
//!
//! Entries, actions, pass statistics and per-entry failures shared by the
//! synchronization engine, the CLI and the reporters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::FileType;
use std::path::{Path, PathBuf};

use crate::{Error, ErrorKind, ErrorSeverity};

/// Unique identifier for a synchronization pass
pub type PassId = uuid::Uuid;

/// Kind of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symlink, device, socket, fifo, ...
    Other,
}

impl EntryKind {
    /// Classify a file type without following symlinks
    pub fn from_file_type(file_type: &FileType) -> Self {
        if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    /// Whether the synchronizer knows how to mirror this kind
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
            Self::Other => f.write_str("special file"),
        }
    }
}

/// A single filesystem action decided during a pass
///
/// Paths are absolute (rooted at the source or replica tree).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "action", rename_all = "snake_case"))]
pub enum SyncAction {
    /// Create a directory in the replica
    CreateDir {
        /// Replica directory to create
        path: PathBuf,
    },
    /// Copy a file that is missing from the replica
    CopyFile {
        /// Source file
        source: PathBuf,
        /// Replica file
        destination: PathBuf,
    },
    /// Remove a replica subtree and copy the source subtree in its place
    ReplaceDir {
        /// Source directory
        source: PathBuf,
        /// Replica directory
        destination: PathBuf,
    },
    /// Overwrite a replica file whose content differs
    ReplaceFile {
        /// Source file
        source: PathBuf,
        /// Replica file
        destination: PathBuf,
    },
    /// Remove a replica file that has no source counterpart
    DeleteFile {
        /// Replica file
        path: PathBuf,
    },
    /// Remove a replica directory (and its subtree) that has no source counterpart
    DeleteDir {
        /// Replica directory
        path: PathBuf,
    },
}

impl SyncAction {
    /// The replica-side path this action touches
    pub fn target(&self) -> &Path {
        match self {
            Self::CreateDir { path } | Self::DeleteFile { path } | Self::DeleteDir { path } => path,
            Self::CopyFile { destination, .. }
            | Self::ReplaceDir { destination, .. }
            | Self::ReplaceFile { destination, .. } => destination,
        }
    }

    /// The event emitted once this action has been applied
    pub fn event_kind(&self) -> EventKind {
        match self {
            Self::CreateDir { .. } => EventKind::DirectoryCreated,
            Self::CopyFile { .. } => EventKind::FileCopied,
            Self::ReplaceDir { .. } => EventKind::DirectoryReplaced,
            Self::ReplaceFile { .. } => EventKind::FileUpdated,
            Self::DeleteFile { .. } => EventKind::FileDeleted,
            Self::DeleteDir { .. } => EventKind::DirectoryDeleted,
        }
    }

    /// Whether this action removes data from the replica
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::DeleteFile { .. } | Self::DeleteDir { .. })
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir { path } => write!(f, "create directory '{}'", path.display()),
            Self::CopyFile {
                source,
                destination,
            } => write!(
                f,
                "copy '{}' to '{}'",
                source.display(),
                destination.display()
            ),
            Self::ReplaceDir {
                source,
                destination,
            } => write!(
                f,
                "replace directory '{}' with '{}'",
                destination.display(),
                source.display()
            ),
            Self::ReplaceFile {
                source,
                destination,
            } => write!(
                f,
                "update '{}' from '{}'",
                destination.display(),
                source.display()
            ),
            Self::DeleteFile { path } => write!(f, "delete file '{}'", path.display()),
            Self::DeleteDir { path } => write!(f, "delete directory '{}'", path.display()),
        }
    }
}

/// Kind of event delivered to a [`crate::Reporter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EventKind {
    /// A pass started
    PassStarted,
    /// A pass finished (or was cancelled)
    PassCompleted,
    /// Replica directory created
    DirectoryCreated,
    /// File copied into the replica
    FileCopied,
    /// Replica file overwritten with new content
    FileUpdated,
    /// Replica subtree replaced wholesale
    DirectoryReplaced,
    /// Replica file deleted
    FileDeleted,
    /// Replica directory deleted
    DirectoryDeleted,
    /// Entry skipped (vanished, unsupported kind)
    EntrySkipped,
    /// Entry failed (I/O failure, kind conflict)
    EntryFailed,
}

impl EventKind {
    /// Whether this event stands for a filesystem action
    pub fn is_action(self) -> bool {
        matches!(
            self,
            Self::DirectoryCreated
                | Self::FileCopied
                | Self::FileUpdated
                | Self::DirectoryReplaced
                | Self::FileDeleted
                | Self::DirectoryDeleted
        )
    }

    /// Short human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::DirectoryCreated => "created directory",
            Self::FileCopied => "copied file",
            Self::FileUpdated => "updated file",
            Self::DirectoryReplaced => "replaced directory",
            Self::FileDeleted => "deleted file",
            Self::DirectoryDeleted => "deleted directory",
            Self::EntrySkipped => "skipped",
            Self::EntryFailed => "failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-action counters for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncStats {
    /// Directories created in the replica
    pub directories_created: u64,
    /// Files copied into the replica
    pub files_copied: u64,
    /// Replica files overwritten
    pub files_updated: u64,
    /// Replica directories replaced wholesale
    pub directories_replaced: u64,
    /// Replica files deleted
    pub files_deleted: u64,
    /// Replica directories deleted
    pub directories_deleted: u64,
    /// Bytes written to the replica
    pub bytes_copied: u64,
}

impl SyncStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one applied action and the bytes it wrote
    pub fn record(&mut self, action: &SyncAction, bytes: u64) {
        match action {
            SyncAction::CreateDir { .. } => self.directories_created += 1,
            SyncAction::CopyFile { .. } => self.files_copied += 1,
            SyncAction::ReplaceDir { .. } => self.directories_replaced += 1,
            SyncAction::ReplaceFile { .. } => self.files_updated += 1,
            SyncAction::DeleteFile { .. } => self.files_deleted += 1,
            SyncAction::DeleteDir { .. } => self.directories_deleted += 1,
        }
        self.bytes_copied += bytes;
    }

    /// Total number of actions applied
    pub fn actions(&self) -> u64 {
        self.directories_created
            + self.files_copied
            + self.files_updated
            + self.directories_replaced
            + self.files_deleted
            + self.directories_deleted
    }

    /// Actions that removed something from the replica
    pub fn deletions(&self) -> u64 {
        self.files_deleted + self.directories_deleted
    }

    /// Merge statistics from another instance
    pub fn merge(&mut self, other: &SyncStats) {
        self.directories_created += other.directories_created;
        self.files_copied += other.files_copied;
        self.files_updated += other.files_updated;
        self.directories_replaced += other.directories_replaced;
        self.files_deleted += other.files_deleted;
        self.directories_deleted += other.directories_deleted;
        self.bytes_copied += other.bytes_copied;
    }
}

/// A per-entry failure recorded during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncFailure {
    /// Path of the entry that failed
    pub path: PathBuf,
    /// Error kind
    pub kind: ErrorKind,
    /// Error severity
    pub severity: ErrorSeverity,
    /// Human-readable error message
    pub message: String,
}

impl SyncFailure {
    /// Record `error` against `path`
    pub fn new<P: AsRef<Path>>(path: P, error: &Error) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            kind: error.kind(),
            severity: error.severity(),
            message: error.to_string(),
        }
    }

    /// Whether this failure is only a warning (entry skipped)
    pub fn is_warning(&self) -> bool {
        self.severity == ErrorSeverity::Low
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path.display(), self.message)
    }
}
