//! Periodic pass scheduling

use crate::engine::{SyncResult, Synchronizer};
use foldersync_types::{Reporter, Result, SyncInterval};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs synchronization passes for one (source, replica) pair on a timer
///
/// The synchronizer sits behind a mutex that doubles as the single-flight
/// guard: a pass requested while another one holds it is skipped, never
/// queued.
#[derive(Clone)]
pub struct PeriodicSync {
    synchronizer: Arc<Mutex<Synchronizer>>,
    reporter: Arc<dyn Reporter>,
    source: PathBuf,
    replica: PathBuf,
    interval: SyncInterval,
    cancel: CancellationToken,
}

impl std::fmt::Debug for PeriodicSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicSync")
            .field("source", &self.source)
            .field("replica", &self.replica)
            .field("interval", &self.interval)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl PeriodicSync {
    /// Create a scheduler; nothing runs until [`Self::run`] or [`Self::run_once`]
    pub fn new(
        synchronizer: Synchronizer,
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        interval: SyncInterval,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            synchronizer: Arc::new(Mutex::new(synchronizer)),
            reporter,
            source: source.into(),
            replica: replica.into(),
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the loop and the pass in flight
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the loop; the running pass ends at its next entry boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Sleep between passes
    pub fn interval(&self) -> SyncInterval {
        self.interval
    }

    /// Source root
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Replica root
    pub fn replica(&self) -> &Path {
        &self.replica
    }

    /// Run a single pass now, or return `None` if one is already in flight
    pub async fn run_once(&self) -> Option<Result<SyncResult>> {
        let Ok(mut synchronizer) = self.synchronizer.try_lock() else {
            warn!("A sync pass is still running, skipping this one");
            return None;
        };

        Some(
            synchronizer
                .synchronize_until(
                    &self.source,
                    &self.replica,
                    self.reporter.as_ref(),
                    &self.cancel,
                )
                .await,
        )
    }

    /// Loop pass, sleep until cancelled; returns the number of completed passes
    ///
    /// A pass that fails outright (for example because a root is missing) is
    /// logged and retried after the next interval.
    pub async fn run(&self) -> u64 {
        info!(
            "Mirroring {} -> {} every {}s",
            self.source.display(),
            self.replica.display(),
            self.interval.as_secs()
        );

        let mut passes = 0;
        loop {
            match self.run_once().await {
                Some(Ok(result)) if result.cancelled => break,
                Some(Ok(_)) => passes += 1,
                Some(Err(e)) => error!("Sync pass failed: {}", e),
                None => {}
            }

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval.as_duration()) => {}
            }
        }

        info!("Periodic sync stopped after {} passes", passes);
        passes
    }
}
