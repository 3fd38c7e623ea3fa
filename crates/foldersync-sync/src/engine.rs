//! Main synchronization engine
//!
//! A pass runs in two phases. The forward phase walks the source tree
//! pre-order and creates, copies or updates replica entries. The reverse
//! phase walks the replica tree and deletes whatever has no source
//! counterpart. Every create and update lands before the first deletion.
//!
//! Only an invalid root aborts a pass. Problems with individual entries are
//! reported, recorded in [`SyncResult::errors`] and skipped.

use crate::fingerprint::{sorted_children, Fingerprint, Fingerprinter};
use chrono::{DateTime, Utc};
use foldersync_types::{
    DirectoryPolicy, EntryKind, Error, EventKind, PassId, Reporter, Result, SyncAction,
    SyncFailure, SyncStats,
};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Synchronization options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Decide and report actions without touching the replica
    pub dry_run: bool,
    /// How existing replica directories are brought up to date
    pub directory_policy: DirectoryPolicy,
    /// Copy modification times onto copied files
    pub preserve_timestamps: bool,
    /// Reuse file fingerprints across passes while size and mtime are unchanged
    pub cache_fingerprints: bool,
}

impl SyncOptions {
    /// Options for a pass that only reports what it would do
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Default::default()
        }
    }

    /// Options that replace changed directories wholesale
    pub fn replace_directories() -> Self {
        Self {
            directory_policy: DirectoryPolicy::Replace,
            ..Default::default()
        }
    }

    /// Options with the fingerprint cache enabled
    pub fn cached() -> Self {
        Self {
            cache_fingerprints: true,
            ..Default::default()
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            directory_policy: DirectoryPolicy::Merge,
            preserve_timestamps: true,
            cache_fingerprints: false,
        }
    }
}

/// Synchronization result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    /// Pass ID for tracking
    pub pass_id: PassId,
    /// Source root
    pub source: PathBuf,
    /// Replica root
    pub replica: PathBuf,
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// Pass duration
    pub duration: Duration,
    /// Source entries examined
    pub items_scanned: u64,
    /// Applied (or, in a dry run, planned) actions
    pub stats: SyncStats,
    /// Per-entry failures, in the order they happened
    pub errors: Vec<SyncFailure>,
    /// Whether the pass stopped early on cancellation
    pub cancelled: bool,
    /// Whether this was a dry run
    pub dry_run: bool,
}

impl SyncResult {
    fn new(source: &Path, replica: &Path, dry_run: bool) -> Self {
        Self {
            pass_id: uuid::Uuid::new_v4(),
            source: source.to_path_buf(),
            replica: replica.to_path_buf(),
            started_at: Utc::now(),
            duration: Duration::default(),
            items_scanned: 0,
            stats: SyncStats::new(),
            errors: Vec::new(),
            cancelled: false,
            dry_run,
        }
    }

    /// Number of actions applied
    pub fn actions_applied(&self) -> u64 {
        self.stats.actions()
    }

    /// True when the pass ran to completion without a single failure
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }

    /// Entries that were skipped (vanished, unsupported kind)
    pub fn warnings(&self) -> impl Iterator<Item = &SyncFailure> {
        self.errors.iter().filter(|failure| failure.is_warning())
    }

    /// Entries that failed and need attention
    pub fn failures(&self) -> impl Iterator<Item = &SyncFailure> {
        self.errors.iter().filter(|failure| !failure.is_warning())
    }

    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        let stats = &self.stats;
        format!(
            "{} scanned, {} actions ({} dirs created, {} files copied, {} files updated, \
             {} dirs replaced, {} files deleted, {} dirs deleted), {} warnings, {} errors{}",
            self.items_scanned,
            stats.actions(),
            stats.directories_created,
            stats.files_copied,
            stats.files_updated,
            stats.directories_replaced,
            stats.files_deleted,
            stats.directories_deleted,
            self.warnings().count(),
            self.failures().count(),
            if self.cancelled { ", cancelled" } else { "" }
        )
    }
}

/// Outcome of comparing two tree fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyReport {
    /// Fingerprint of the source root
    pub source: Fingerprint,
    /// Fingerprint of the replica root
    pub replica: Fingerprint,
}

impl VerifyReport {
    /// Whether both trees hold the same names and content
    pub fn in_sync(&self) -> bool {
        self.source == self.replica
    }
}

/// Main synchronization engine
///
/// One `Synchronizer` serves one (source, replica) pair at a time; passes take
/// `&mut self`, so they cannot overlap.
#[derive(Debug, Default)]
pub struct Synchronizer {
    options: SyncOptions,
    fingerprinter: Fingerprinter,
}

impl Synchronizer {
    /// Create a synchronizer with default options
    pub fn new() -> Self {
        Self::with_options(SyncOptions::default())
    }

    /// Create a synchronizer with custom options
    pub fn with_options(options: SyncOptions) -> Self {
        let fingerprinter = if options.cache_fingerprints {
            Fingerprinter::with_cache()
        } else {
            Fingerprinter::new()
        };

        Self {
            options,
            fingerprinter,
        }
    }

    /// The options this synchronizer runs with
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// The fingerprinter (and its cache) shared by all passes
    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }

    /// Run one pass to completion
    pub async fn synchronize<R: Reporter + ?Sized>(
        &mut self,
        source: &Path,
        replica: &Path,
        reporter: &R,
    ) -> Result<SyncResult> {
        self.synchronize_until(source, replica, reporter, &CancellationToken::new())
            .await
    }

    /// Run one pass, stopping between entries once `cancel` fires
    pub async fn synchronize_until<R: Reporter + ?Sized>(
        &mut self,
        source: &Path,
        replica: &Path,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<SyncResult> {
        let start_time = Instant::now();
        validate_roots(source, replica).await?;

        info!(
            "Starting sync: {} -> {}",
            source.display(),
            replica.display()
        );
        reporter.report(
            EventKind::PassStarted,
            source,
            &format!("mirroring onto '{}'", replica.display()),
        );

        if let Some(cache) = self.fingerprinter.cache_mut() {
            cache.begin_pass();
        }

        let mut pass = Pass {
            options: &self.options,
            fingerprinter: &mut self.fingerprinter,
            reporter,
            cancel,
            result: SyncResult::new(source, replica, self.options.dry_run),
        };

        pass.forward_dir(source, replica).await;
        if !pass.result.cancelled {
            pass.reverse_dir(source, replica).await;
        }

        let mut result = pass.result;
        if !result.cancelled {
            if let Some(cache) = self.fingerprinter.cache_mut() {
                cache.prune_unseen();
            }
        }

        result.duration = start_time.elapsed();
        reporter.report(EventKind::PassCompleted, replica, &result.summary());
        info!("Sync completed in {:?}: {}", result.duration, result.summary());

        Ok(result)
    }
}

/// Run one pass with default options
pub async fn synchronize<S, D, R>(source: S, replica: D, reporter: &R) -> Result<SyncResult>
where
    S: AsRef<Path>,
    D: AsRef<Path>,
    R: Reporter + ?Sized,
{
    Synchronizer::new()
        .synchronize(source.as_ref(), replica.as_ref(), reporter)
        .await
}

/// Compare the root fingerprints of two trees
pub async fn verify<S: AsRef<Path>, D: AsRef<Path>>(source: S, replica: D) -> Result<VerifyReport> {
    let (source, replica) = (source.as_ref(), replica.as_ref());
    validate_roots(source, replica).await?;

    let mut fingerprinter = Fingerprinter::new();
    let source = fingerprinter.fingerprint(source).await?;
    let replica = fingerprinter.fingerprint(replica).await?;

    Ok(VerifyReport { source, replica })
}

/// Both roots must be existing, non-overlapping directories
async fn validate_roots(source: &Path, replica: &Path) -> Result<()> {
    for (label, root) in [("Source", source), ("Replica", replica)] {
        match fs::metadata(root).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(Error::invalid_root(
                    root,
                    format!("{} path is not a directory", label),
                ))
            }
            Err(e) => {
                return Err(Error::invalid_root(
                    root,
                    format!("{} path is not accessible: {}", label, e),
                ))
            }
        }
    }

    let source_real = fs::canonicalize(source)
        .await
        .map_err(|e| Error::invalid_root(source, e.to_string()))?;
    let replica_real = fs::canonicalize(replica)
        .await
        .map_err(|e| Error::invalid_root(replica, e.to_string()))?;

    if source_real.starts_with(&replica_real) || replica_real.starts_with(&source_real) {
        return Err(Error::invalid_root(
            replica,
            "source and replica trees overlap",
        ));
    }

    Ok(())
}

/// Kind of the entry at `path`, or `None` if nothing is there
async fn entry_kind(path: &Path) -> Result<Option<EntryKind>> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) => Ok(Some(EntryKind::from_file_type(&metadata.file_type()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io_at("inspect", path, e)),
    }
}

/// First path below the pair whose entry kinds differ between the two sides,
/// or whose source entry is of an unsupported kind
fn merge_required<'a>(
    source_dir: &'a Path,
    replica_dir: &'a Path,
) -> BoxFuture<'a, Result<Option<PathBuf>>> {
    async move {
        for (name, source_path) in sorted_children(source_dir).await? {
            let replica_path = replica_dir.join(&name);
            let source_kind = entry_kind(&source_path).await?;
            let replica_kind = entry_kind(&replica_path).await?;

            match (source_kind, replica_kind) {
                (Some(EntryKind::Other), _) => return Ok(Some(source_path)),
                (Some(EntryKind::Directory), Some(EntryKind::Directory)) => {
                    if let Some(path) = merge_required(&source_path, &replica_path).await? {
                        return Ok(Some(path));
                    }
                }
                (Some(source_kind), Some(replica_kind)) if source_kind != replica_kind => {
                    return Ok(Some(replica_path));
                }
                _ => {}
            }
        }
        Ok(None)
    }
    .boxed()
}

/// Copy content (and permissions), then the modification time
async fn copy_file(source: &Path, destination: &Path, preserve_timestamps: bool) -> Result<u64> {
    let bytes = fs::copy(source, destination)
        .await
        .map_err(|e| Error::io_at("copy", source, e))?;

    if preserve_timestamps {
        let metadata = fs::metadata(source)
            .await
            .map_err(|e| Error::io_at("read metadata of", source, e))?;

        if let Ok(modified) = metadata.modified() {
            filetime::set_file_mtime(destination, filetime::FileTime::from_system_time(modified))
                .map_err(|e| Error::io_at("set modification time of", destination, e))?;
        }
    }

    Ok(bytes)
}

/// Clear the read-only flag so an existing replica file can be overwritten
async fn make_writable(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| Error::io_at("read metadata of", path, e))?;
    let mut permissions = metadata.permissions();

    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)
            .await
            .map_err(|e| Error::io_at("make writable", path, e))?;
    }

    Ok(())
}

/// State of one running pass
struct Pass<'a, R: ?Sized> {
    options: &'a SyncOptions,
    fingerprinter: &'a mut Fingerprinter,
    reporter: &'a R,
    cancel: &'a CancellationToken,
    result: SyncResult,
}

impl<'a, R: Reporter + ?Sized> Pass<'a, R> {
    fn should_stop(&mut self) -> bool {
        if !self.result.cancelled && self.cancel.is_cancelled() {
            warn!("Sync pass {} cancelled", self.result.pass_id);
            self.result.cancelled = true;
        }
        self.result.cancelled
    }

    fn forward_dir<'b>(
        &'b mut self,
        source_dir: &'b Path,
        replica_dir: &'b Path,
    ) -> BoxFuture<'b, ()> {
        async move {
            let children = match sorted_children(source_dir).await {
                Ok(children) => children,
                Err(e) => return self.fail(source_dir, &e),
            };

            for (name, source_path) in children {
                if self.should_stop() {
                    return;
                }
                self.result.items_scanned += 1;
                let replica_path = replica_dir.join(&name);
                self.visit(&source_path, &replica_path).await;
            }
        }
        .boxed()
    }

    async fn visit(&mut self, source: &Path, replica: &Path) {
        let source_kind = match entry_kind(source).await {
            Ok(Some(kind)) => kind,
            Ok(None) => return self.fail(source, &Error::vanished(source)),
            Err(e) => return self.fail(source, &e),
        };
        let replica_kind = match entry_kind(replica).await {
            Ok(kind) => kind,
            Err(e) => return self.fail(replica, &e),
        };

        match (source_kind, replica_kind) {
            (EntryKind::Other, _) => self.fail(source, &Error::unsupported(source)),
            (EntryKind::Directory, None) => {
                let created = self
                    .run(SyncAction::CreateDir {
                        path: replica.to_path_buf(),
                    })
                    .await;
                if created {
                    self.forward_dir(source, replica).await;
                }
            }
            (EntryKind::Directory, Some(EntryKind::Directory)) => {
                match self.options.directory_policy {
                    DirectoryPolicy::Merge => self.forward_dir(source, replica).await,
                    DirectoryPolicy::Replace => self.replace_dir_if_changed(source, replica).await,
                }
            }
            (EntryKind::File, None) => {
                self.run(SyncAction::CopyFile {
                    source: source.to_path_buf(),
                    destination: replica.to_path_buf(),
                })
                .await;
            }
            (EntryKind::File, Some(EntryKind::File)) => {
                self.update_file_if_changed(source, replica).await;
            }
            (source_kind, Some(replica_kind)) => {
                self.fail(replica, &Error::kind_conflict(replica, source_kind, replica_kind));
            }
        }
    }

    async fn update_file_if_changed(&mut self, source: &Path, replica: &Path) {
        if let Some((source_fp, replica_fp)) = self.fingerprint_pair(source, replica).await {
            if source_fp == replica_fp {
                debug!("Unchanged: {}", source.display());
                return;
            }
            self.run(SyncAction::ReplaceFile {
                source: source.to_path_buf(),
                destination: replica.to_path_buf(),
            })
            .await;
        }
    }

    /// Replace a changed directory wholesale, or merge it when replacing
    /// would resolve a kind conflict by deletion or hide a failing entry
    async fn replace_dir_if_changed(&mut self, source: &Path, replica: &Path) {
        match merge_required(source, replica).await {
            Ok(None) => {}
            Ok(Some(path)) => {
                debug!(
                    "Merging '{}' instead of replacing it: '{}' differs in kind",
                    replica.display(),
                    path.display()
                );
                return self.forward_dir(source, replica).await;
            }
            Err(e) => {
                debug!("Merging '{}' instead of replacing it: {}", replica.display(), e);
                return self.forward_dir(source, replica).await;
            }
        }

        let source_fp = self.fingerprinter.fingerprint(source).await;
        let fingerprints = match source_fp {
            Ok(source_fp) => self
                .fingerprinter
                .fingerprint(replica)
                .await
                .map(|replica_fp| (source_fp, replica_fp)),
            Err(e) => Err(e),
        };

        match fingerprints {
            Ok((source_fp, replica_fp)) if source_fp == replica_fp => {
                debug!("Unchanged directory: {}", source.display());
            }
            Ok(_) => {
                self.run(SyncAction::ReplaceDir {
                    source: source.to_path_buf(),
                    destination: replica.to_path_buf(),
                })
                .await;
            }
            // Merging reports the failure on the entry that caused it
            Err(e) => {
                debug!("Merging '{}' instead of replacing it: {}", replica.display(), e);
                self.forward_dir(source, replica).await;
            }
        }
    }

    async fn fingerprint_pair(
        &mut self,
        source: &Path,
        replica: &Path,
    ) -> Option<(Fingerprint, Fingerprint)> {
        let source_fp = match self.fingerprinter.fingerprint(source).await {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                self.fail(source, &e);
                return None;
            }
        };
        let replica_fp = match self.fingerprinter.fingerprint(replica).await {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                self.fail(replica, &e);
                return None;
            }
        };
        Some((source_fp, replica_fp))
    }

    fn reverse_dir<'b>(
        &'b mut self,
        source_dir: &'b Path,
        replica_dir: &'b Path,
    ) -> BoxFuture<'b, ()> {
        async move {
            // An unlistable source directory was already reported by the
            // forward pass; nothing below it can be judged stale.
            let source_names: HashSet<OsString> = match sorted_children(source_dir).await {
                Ok(children) => children.into_iter().map(|(name, _)| name).collect(),
                Err(e) => {
                    debug!("Not pruning '{}': {}", replica_dir.display(), e);
                    return;
                }
            };
            let children = match sorted_children(replica_dir).await {
                Ok(children) => children,
                Err(e) => return self.fail(replica_dir, &e),
            };

            for (name, replica_path) in children {
                if self.should_stop() {
                    return;
                }

                let replica_kind = match entry_kind(&replica_path).await {
                    Ok(Some(kind)) => kind,
                    Ok(None) => continue,
                    Err(e) => {
                        self.fail(&replica_path, &e);
                        continue;
                    }
                };
                let source_path = source_dir.join(&name);
                let source_kind = if source_names.contains(&name) {
                    match entry_kind(&source_path).await {
                        Ok(kind) => kind,
                        Err(e) => {
                            self.fail(&source_path, &e);
                            continue;
                        }
                    }
                } else {
                    None
                };

                match (replica_kind, source_kind) {
                    (EntryKind::Directory, None) => {
                        self.run(SyncAction::DeleteDir { path: replica_path }).await;
                    }
                    (_, None) => {
                        self.run(SyncAction::DeleteFile { path: replica_path }).await;
                    }
                    (EntryKind::Directory, Some(EntryKind::Directory)) => {
                        self.reverse_dir(&source_path, &replica_path).await;
                    }
                    // Same-kind files were handled by the forward pass, kind
                    // conflicts were reported there.
                    _ => {}
                }
            }
        }
        .boxed()
    }

    /// Apply (or plan) one action and report it; returns whether it succeeded
    async fn run(&mut self, action: SyncAction) -> bool {
        let outcome = if self.options.dry_run {
            Ok(planned_bytes(&action).await)
        } else {
            let outcome = self.apply(&action).await;
            if let Some(cache) = self.fingerprinter.cache_mut() {
                cache.invalidate(action.target());
            }
            outcome
        };

        match outcome {
            Ok(bytes) => {
                self.result.stats.record(&action, bytes);
                let detail = if self.options.dry_run {
                    format!("dry run, would {}", action)
                } else {
                    action.to_string()
                };
                debug!("Applied: {}", detail);
                self.reporter
                    .report(action.event_kind(), action.target(), &detail);
                true
            }
            Err(e) => {
                self.fail(action.target(), &e);
                false
            }
        }
    }

    async fn apply(&mut self, action: &SyncAction) -> Result<u64> {
        match action {
            SyncAction::CreateDir { path } => {
                fs::create_dir_all(path)
                    .await
                    .map_err(|e| Error::io_at("create directory", path, e))?;
                Ok(0)
            }
            SyncAction::CopyFile {
                source,
                destination,
            } => copy_file(source, destination, self.options.preserve_timestamps).await,
            SyncAction::ReplaceFile {
                source,
                destination,
            } => {
                make_writable(destination).await?;
                copy_file(source, destination, self.options.preserve_timestamps).await
            }
            SyncAction::ReplaceDir {
                source,
                destination,
            } => {
                fs::remove_dir_all(destination)
                    .await
                    .map_err(|e| Error::io_at("remove directory", destination, e))?;
                fs::create_dir(destination)
                    .await
                    .map_err(|e| Error::io_at("create directory", destination, e))?;
                Ok(self.copy_tree(source, destination).await)
            }
            SyncAction::DeleteFile { path } => {
                fs::remove_file(path)
                    .await
                    .map_err(|e| Error::io_at("delete file", path, e))?;
                Ok(0)
            }
            SyncAction::DeleteDir { path } => {
                fs::remove_dir_all(path)
                    .await
                    .map_err(|e| Error::io_at("delete directory", path, e))?;
                Ok(0)
            }
        }
    }

    /// Copy the contents of `source_dir` into the existing `replica_dir`
    fn copy_tree<'b>(
        &'b mut self,
        source_dir: &'b Path,
        replica_dir: &'b Path,
    ) -> BoxFuture<'b, u64> {
        async move {
            let children = match sorted_children(source_dir).await {
                Ok(children) => children,
                Err(e) => {
                    self.fail(source_dir, &e);
                    return 0;
                }
            };

            let mut bytes = 0;
            for (name, source_path) in children {
                let replica_path = replica_dir.join(&name);
                match entry_kind(&source_path).await {
                    Ok(Some(EntryKind::File)) => {
                        let preserve = self.options.preserve_timestamps;
                        match copy_file(&source_path, &replica_path, preserve).await {
                            Ok(copied) => bytes += copied,
                            Err(e) => self.fail(&source_path, &e),
                        }
                    }
                    Ok(Some(EntryKind::Directory)) => {
                        if let Err(e) = fs::create_dir(&replica_path).await {
                            let error = Error::io_at("create directory", &replica_path, e);
                            self.fail(&replica_path, &error);
                            continue;
                        }
                        bytes += self.copy_tree(&source_path, &replica_path).await;
                    }
                    Ok(Some(EntryKind::Other)) => {
                        self.fail(&source_path, &Error::unsupported(&source_path));
                    }
                    Ok(None) => self.fail(&source_path, &Error::vanished(&source_path)),
                    Err(e) => self.fail(&source_path, &e),
                }
            }
            bytes
        }
        .boxed()
    }

    fn fail(&mut self, path: &Path, error: &Error) {
        let failure = SyncFailure::new(path, error);
        let kind = if failure.is_warning() {
            EventKind::EntrySkipped
        } else {
            EventKind::EntryFailed
        };
        debug!("{}: {}", kind, failure);
        self.reporter
            .report(kind, path, &format!("{}: {}", failure.kind, failure.message));
        self.result.errors.push(failure);
    }
}

/// Bytes a copy would write, for dry-run accounting
async fn planned_bytes(action: &SyncAction) -> u64 {
    match action {
        SyncAction::CopyFile { source, .. } | SyncAction::ReplaceFile { source, .. } => {
            fs::metadata(source).await.map(|m| m.len()).unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MemoryReporter;
    use foldersync_types::ErrorKind;
    use tempfile::TempDir;

    struct Trees {
        _temp: TempDir,
        source: PathBuf,
        replica: PathBuf,
    }

    fn trees() -> Trees {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let replica = temp.path().join("replica");
        std::fs::create_dir(&source).unwrap();
        std::fs::create_dir(&replica).unwrap();
        Trees {
            _temp: temp,
            source,
            replica,
        }
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn read(root: &Path, relative: &str) -> String {
        std::fs::read_to_string(root.join(relative)).unwrap()
    }

    #[test]
    fn test_sync_options() {
        let defaults = SyncOptions::default();
        assert!(!defaults.dry_run);
        assert!(defaults.preserve_timestamps);
        assert_eq!(defaults.directory_policy, DirectoryPolicy::Merge);

        assert!(SyncOptions::dry_run().dry_run);
        assert_eq!(
            SyncOptions::replace_directories().directory_policy,
            DirectoryPolicy::Replace
        );
        assert!(SyncOptions::cached().cache_fingerprints);
    }

    #[tokio::test]
    async fn test_copies_into_empty_replica() {
        let t = trees();
        write(&t.source, "a.txt", "hello");
        write(&t.source, "sub/b.txt", "world");

        let reporter = MemoryReporter::new();
        let result = synchronize(&t.source, &t.replica, &reporter).await.unwrap();

        assert_eq!(read(&t.replica, "a.txt"), "hello");
        assert_eq!(read(&t.replica, "sub/b.txt"), "world");
        assert_eq!(result.actions_applied(), 3);
        assert_eq!(result.stats.directories_created, 1);
        assert_eq!(result.stats.files_copied, 2);
        assert_eq!(result.items_scanned, 3);
        assert_eq!(reporter.actions().len(), 3);
        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn test_creates_directory_before_its_children() {
        let t = trees();
        write(&t.source, "sub/b.txt", "world");

        let reporter = MemoryReporter::new();
        synchronize(&t.source, &t.replica, &reporter).await.unwrap();

        let kinds: Vec<_> = reporter.actions().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::DirectoryCreated, EventKind::FileCopied]);
    }

    #[tokio::test]
    async fn test_updates_changed_file() {
        let t = trees();
        write(&t.source, "a.txt", "v2");
        write(&t.replica, "a.txt", "v1");

        let reporter = MemoryReporter::new();
        let result = synchronize(&t.source, &t.replica, &reporter).await.unwrap();

        assert_eq!(read(&t.replica, "a.txt"), "v2");
        assert_eq!(result.stats.files_updated, 1);
        assert_eq!(result.actions_applied(), 1);
        assert_eq!(reporter.count(EventKind::FileUpdated), 1);
    }

    #[tokio::test]
    async fn test_deletes_stale_entries() {
        let t = trees();
        write(&t.source, "a.txt", "hello");
        write(&t.replica, "a.txt", "hello");
        write(&t.replica, "stale.txt", "x");
        write(&t.replica, "old/deep/file.txt", "x");

        let reporter = MemoryReporter::new();
        let result = synchronize(&t.source, &t.replica, &reporter).await.unwrap();

        assert!(!t.replica.join("stale.txt").exists());
        assert!(!t.replica.join("old").exists());
        assert_eq!(result.stats.files_deleted, 1);
        assert_eq!(result.stats.directories_deleted, 1);
        assert_eq!(result.stats.files_copied, 0);
        assert_eq!(read(&t.replica, "a.txt"), "hello");
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let t = trees();
        write(&t.source, "a.txt", "hello");
        write(&t.source, "x/y/z.txt", "deep");
        write(&t.replica, "junk.bin", "junk");

        let mut synchronizer = Synchronizer::new();
        let reporter = MemoryReporter::new();
        let first = synchronizer
            .synchronize(&t.source, &t.replica, &reporter)
            .await
            .unwrap();
        assert!(first.actions_applied() > 0);

        let second = synchronizer
            .synchronize(&t.source, &t.replica, &reporter)
            .await
            .unwrap();
        assert_eq!(second.actions_applied(), 0);
        assert!(second.is_clean());
    }

    #[tokio::test]
    async fn test_kind_conflict_is_reported_and_left_alone() {
        let t = trees();
        write(&t.source, "data", "i am a file");
        write(&t.replica, "data/inner.txt", "i am in a directory");
        write(&t.source, "dir/a.txt", "a");
        write(&t.replica, "dir", "i am a file");
        write(&t.source, "ok.txt", "fine");

        let reporter = MemoryReporter::new();
        let result = synchronize(&t.source, &t.replica, &reporter).await.unwrap();

        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|f| f.kind == ErrorKind::KindConflict));
        assert_eq!(reporter.count(EventKind::EntryFailed), 2);
        assert_eq!(read(&t.replica, "data/inner.txt"), "i am in a directory");
        assert_eq!(read(&t.replica, "dir"), "i am a file");
        assert_eq!(read(&t.replica, "ok.txt"), "fine");
    }

    #[tokio::test]
    async fn test_dry_run_leaves_replica_untouched() {
        let t = trees();
        write(&t.source, "a.txt", "new");
        write(&t.source, "sub/b.txt", "b");
        write(&t.replica, "stale.txt", "x");

        let reporter = MemoryReporter::new();
        let mut synchronizer = Synchronizer::with_options(SyncOptions::dry_run());
        let result = synchronizer
            .synchronize(&t.source, &t.replica, &reporter)
            .await
            .unwrap();

        assert!(result.dry_run);
        assert_eq!(result.actions_applied(), 4);
        assert_eq!(result.stats.bytes_copied, 4);
        assert!(!t.replica.join("a.txt").exists());
        assert!(!t.replica.join("sub").exists());
        assert!(t.replica.join("stale.txt").exists());
        assert!(reporter
            .actions()
            .iter()
            .all(|event| event.detail.starts_with("dry run, would")));
    }

    #[tokio::test]
    async fn test_replace_policy_rewrites_changed_subtree() {
        let t = trees();
        write(&t.source, "sub/a.txt", "new");
        write(&t.source, "sub/b.txt", "same");
        write(&t.source, "same/c.txt", "c");
        write(&t.replica, "sub/a.txt", "old");
        write(&t.replica, "sub/b.txt", "same");
        write(&t.replica, "sub/extra.txt", "extra");
        write(&t.replica, "same/c.txt", "c");

        let reporter = MemoryReporter::new();
        let mut synchronizer = Synchronizer::with_options(SyncOptions::replace_directories());
        let result = synchronizer
            .synchronize(&t.source, &t.replica, &reporter)
            .await
            .unwrap();

        assert_eq!(result.stats.directories_replaced, 1);
        assert_eq!(result.actions_applied(), 1);
        assert_eq!(read(&t.replica, "sub/a.txt"), "new");
        assert_eq!(read(&t.replica, "sub/b.txt"), "same");
        assert!(!t.replica.join("sub/extra.txt").exists());

        let report = verify(&t.source, &t.replica).await.unwrap();
        assert!(report.in_sync());
    }

    #[tokio::test]
    async fn test_cancelled_pass_stops_between_entries() {
        let t = trees();
        write(&t.source, "a.txt", "a");
        write(&t.replica, "stale.txt", "x");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut synchronizer = Synchronizer::new();
        let result = synchronizer
            .synchronize_until(&t.source, &t.replica, &MemoryReporter::new(), &cancel)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert!(!result.is_clean());
        assert_eq!(result.actions_applied(), 0);
        assert!(t.replica.join("stale.txt").exists());
    }

    #[tokio::test]
    async fn test_invalid_roots() {
        let t = trees();
        write(&t.source, "file.txt", "x");
        let reporter = MemoryReporter::new();

        let missing = synchronize(t.source.join("missing"), &t.replica, &reporter)
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::InvalidRoot);

        let not_dir = synchronize(&t.source, t.source.join("file.txt"), &reporter)
            .await
            .unwrap_err();
        assert_eq!(not_dir.kind(), ErrorKind::InvalidRoot);

        std::fs::create_dir(t.source.join("nested")).unwrap();
        let nested = synchronize(&t.source, t.source.join("nested"), &reporter)
            .await
            .unwrap_err();
        assert_eq!(nested.kind(), ErrorKind::InvalidRoot);

        assert!(reporter.events().is_empty());
    }

    #[tokio::test]
    async fn test_cache_keeps_passes_idempotent() {
        let t = trees();
        write(&t.source, "a.txt", "hello");
        write(&t.replica, "a.txt", "hellO");

        let mut synchronizer = Synchronizer::with_options(SyncOptions::cached());
        let reporter = MemoryReporter::new();
        let first = synchronizer
            .synchronize(&t.source, &t.replica, &reporter)
            .await
            .unwrap();
        assert_eq!(first.stats.files_updated, 1);

        let second = synchronizer
            .synchronize(&t.source, &t.replica, &reporter)
            .await
            .unwrap();
        assert_eq!(second.actions_applied(), 0);
        assert!(synchronizer.fingerprinter().cache().unwrap().stats().hits >= 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_is_skipped_and_reported_once() {
        let t = trees();
        write(&t.source, "a.txt", "hello");
        std::os::unix::fs::symlink(t.source.join("a.txt"), t.source.join("link")).unwrap();

        let reporter = MemoryReporter::new();
        let result = synchronize(&t.source, &t.replica, &reporter).await.unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::UnsupportedEntryKind);
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(reporter.count(EventKind::EntrySkipped), 1);
        assert_eq!(read(&t.replica, "a.txt"), "hello");
        assert!(std::fs::symlink_metadata(t.replica.join("link")).is_err());
    }

    #[tokio::test]
    async fn test_replace_policy_keeps_kind_conflicts() {
        let t = trees();
        write(&t.source, "sub/item", "a file in the source");
        write(&t.source, "sub/new.txt", "new");
        write(&t.replica, "sub/item/precious.txt", "only in the replica");

        let reporter = MemoryReporter::new();
        let mut synchronizer = Synchronizer::with_options(SyncOptions::replace_directories());
        let result = synchronizer
            .synchronize(&t.source, &t.replica, &reporter)
            .await
            .unwrap();

        assert_eq!(result.stats.directories_replaced, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::KindConflict);
        assert_eq!(result.errors[0].path, t.replica.join("sub/item"));
        assert_eq!(reporter.count(EventKind::EntryFailed), 1);
        assert_eq!(read(&t.replica, "sub/item/precious.txt"), "only in the replica");
        assert_eq!(read(&t.replica, "sub/new.txt"), "new");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replace_policy_merges_around_unsupported_entries() {
        let t = trees();
        write(&t.source, "sub/a.txt", "a");
        std::fs::create_dir_all(t.replica.join("sub")).unwrap();
        std::os::unix::fs::symlink(t.source.join("sub/a.txt"), t.source.join("sub/link"))
            .unwrap();

        let mut synchronizer = Synchronizer::with_options(SyncOptions::replace_directories());
        let result = synchronizer
            .synchronize(&t.source, &t.replica, &MemoryReporter::new())
            .await
            .unwrap();

        assert_eq!(result.stats.directories_replaced, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::UnsupportedEntryKind);
        assert_eq!(read(&t.replica, "sub/a.txt"), "a");
    }

    #[cfg(unix)]
    fn permissions_enforced(dir: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;

        let probe = dir.join(".probe");
        std::fs::write(&probe, b"x").unwrap();
        std::fs::set_permissions(&probe, std::fs::Permissions::from_mode(0o000)).unwrap();
        let enforced = std::fs::read(&probe).is_err();
        std::fs::remove_file(&probe).unwrap();
        enforced
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replace_policy_isolates_unreadable_file() {
        use std::os::unix::fs::PermissionsExt;

        let t = trees();
        if !permissions_enforced(&t.source) {
            return;
        }
        write(&t.source, "sub/locked.bin", "secret");
        write(&t.source, "sub/ok.txt", "ok");
        write(&t.replica, "sub/stale.txt", "stale");
        let locked = t.source.join("sub/locked.bin");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let mut synchronizer = Synchronizer::with_options(SyncOptions::replace_directories());
        let result = synchronizer
            .synchronize(&t.source, &t.replica, &MemoryReporter::new())
            .await
            .unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Io);
        assert!(result.errors[0].path.ends_with("locked.bin"));
        assert_eq!(read(&t.replica, "sub/ok.txt"), "ok");
        assert!(!t.replica.join("sub/stale.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unlistable_source_directory_is_reported_once() {
        use std::os::unix::fs::PermissionsExt;

        let t = trees();
        if !permissions_enforced(&t.source) {
            return;
        }
        write(&t.source, "sub/a.txt", "a");
        write(&t.replica, "sub/a.txt", "a");
        write(&t.replica, "sub/b.txt", "b");
        write(&t.replica, "sub/c.txt", "c");
        let sub = t.source.join("sub");
        std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o000)).unwrap();

        let reporter = MemoryReporter::new();
        let result = synchronize(&t.source, &t.replica, &reporter).await.unwrap();
        std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, sub);
        assert_eq!(reporter.count(EventKind::EntryFailed), 1);
        assert_eq!(result.stats.deletions(), 0);
        assert!(t.replica.join("sub/b.txt").exists());
        assert!(t.replica.join("sub/c.txt").exists());
    }

    #[tokio::test]
    async fn test_replace_read_only_replica_file() {
        let t = trees();
        write(&t.source, "a.txt", "v2");
        write(&t.replica, "a.txt", "v1");
        let path = t.replica.join("a.txt");
        let mut permissions = std::fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(&path, permissions).unwrap();

        let result = synchronize(&t.source, &t.replica, &MemoryReporter::new())
            .await
            .unwrap();

        assert!(result.is_clean());
        assert_eq!(read(&t.replica, "a.txt"), "v2");
    }

    #[tokio::test]
    async fn test_copied_file_keeps_modification_time() {
        let t = trees();
        write(&t.source, "a.txt", "hello");
        let stamp = filetime::FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(t.source.join("a.txt"), stamp).unwrap();

        synchronize(&t.source, &t.replica, &MemoryReporter::new())
            .await
            .unwrap();

        let metadata = std::fs::metadata(t.replica.join("a.txt")).unwrap();
        assert_eq!(filetime::FileTime::from_last_modification_time(&metadata), stamp);
    }
}
