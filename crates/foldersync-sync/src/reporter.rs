//! Reporter implementations
//!
//! The synchronizer never logs actions through a global handle; it hands
//! every event to the [`Reporter`] it was given. These are the stock ones.

use foldersync_types::{EventKind, Reporter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Forwards events to `tracing`, one line per event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, kind: EventKind, path: &Path, detail: &str) {
        match kind {
            EventKind::EntryFailed => {
                error!(target: "foldersync", "{}: {} ({})", kind, path.display(), detail);
            }
            EventKind::EntrySkipped => {
                warn!(target: "foldersync", "{}: {} ({})", kind, path.display(), detail);
            }
            _ => info!(target: "foldersync", "{}: {} ({})", kind, path.display(), detail),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _kind: EventKind, _path: &Path, _detail: &str) {}
}

/// A reported event, as captured by [`MemoryReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedEvent {
    /// Event kind
    pub kind: EventKind,
    /// Path the event is about
    pub path: PathBuf,
    /// Human-readable detail
    pub detail: String,
}

/// Keeps every event in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ReportedEvent>>,
}

impl MemoryReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<ReportedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Events that stand for filesystem actions
    pub fn actions(&self) -> Vec<ReportedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.kind.is_action())
            .collect()
    }

    /// Number of events of the given kind
    pub fn count(&self, kind: EventKind) -> usize {
        self.events()
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }

    /// Drop all captured events
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, kind: EventKind, path: &Path, detail: &str) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ReportedEvent {
                kind,
                path: path.to_path_buf(),
                detail: detail.to_string(),
            });
    }
}
