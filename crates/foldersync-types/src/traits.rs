//! Core traits for foldersync operations

use crate::EventKind;
use std::path::Path;
use std::sync::Arc;

/// Receiver of human-readable synchronization events
///
/// Calls are fire-and-forget: implementations must not block indefinitely
/// and must swallow their own sink failures.
pub trait Reporter: Send + Sync {
    /// Report one event about `path`
    fn report(&self, kind: EventKind, path: &Path, detail: &str);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, kind: EventKind, path: &Path, detail: &str) {
        (**self).report(kind, path, detail);
    }
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn report(&self, kind: EventKind, path: &Path, detail: &str) {
        (**self).report(kind, path, detail);
    }
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn report(&self, kind: EventKind, path: &Path, detail: &str) {
        (**self).report(kind, path, detail);
    }
}
