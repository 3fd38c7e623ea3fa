//! Unified test utilities for foldersync tests
//!
//! This module provides fixtures used across the integration tests: a
//! source/replica pair in a temporary directory, tree snapshots for comparing
//! the two sides, generated trees for property tests and checks on the order
//! of reported actions.

use foldersync_sync::MemoryReporter;
use foldersync_types::EventKind;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// All zeros
    Zeros,
    /// Printable text
    Text,
    /// Structured bytes, different at every offset within a cycle
    Realistic,
}

/// Generate test data with specified pattern
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Text => b"the quick brown fox jumps over the lazy dog\n"
            .iter()
            .copied()
            .cycle()
            .take(size)
            .collect(),
        TestDataPattern::Realistic => (0..size).map(|i| ((i * 7 + 13) % 256) as u8).collect(),
    }
}

/// A source and a replica directory side by side in one temporary directory
pub struct MirrorFixture {
    temp_dir: TempDir,
    source: PathBuf,
    replica: PathBuf,
}

impl MirrorFixture {
    /// Create empty source and replica roots
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        fs::create_dir(&source).expect("Failed to create source root");
        fs::create_dir(&replica).expect("Failed to create replica root");
        Self {
            temp_dir,
            source,
            replica,
        }
    }

    /// Source root
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Replica root
    pub fn replica(&self) -> &Path {
        &self.replica
    }

    /// A path inside the temporary directory but outside both roots
    pub fn outside(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write a file below the source root, creating parent directories
    pub fn write_source(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        write_file(&self.source, relative, content.as_ref())
    }

    /// Write a file below the replica root, creating parent directories
    pub fn write_replica(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        write_file(&self.replica, relative, content.as_ref())
    }

    /// Create a directory below the source root
    pub fn mkdir_source(&self, relative: &str) -> PathBuf {
        make_dir(&self.source, relative)
    }

    /// Create a directory below the replica root
    pub fn mkdir_replica(&self, relative: &str) -> PathBuf {
        make_dir(&self.replica, relative)
    }

    /// Read a replica file as text
    pub fn read_replica(&self, relative: &str) -> String {
        fs::read_to_string(self.replica.join(relative)).expect("Failed to read replica file")
    }

    /// Snapshot of the source tree
    pub fn source_snapshot(&self) -> TreeSnapshot {
        snapshot(&self.source).expect("Failed to snapshot source")
    }

    /// Snapshot of the replica tree
    pub fn replica_snapshot(&self) -> TreeSnapshot {
        snapshot(&self.replica).expect("Failed to snapshot replica")
    }

    /// Whether both trees hold the same names, kinds and bytes
    pub fn trees_match(&self) -> bool {
        self.source_snapshot() == self.replica_snapshot()
    }
}

impl Default for MirrorFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write test file");
    path
}

fn make_dir(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(&path).expect("Failed to create test directory");
    path
}

/// One entry of a [`TreeSnapshot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEntry {
    /// A directory
    Directory,
    /// A regular file and its bytes
    File(Vec<u8>),
    /// Anything else (symlinks, sockets, ...)
    Other,
}

/// Every entry below a root, keyed by path relative to the root
pub type TreeSnapshot = BTreeMap<PathBuf, SnapshotEntry>;

/// Capture a tree without following symlinks
pub fn snapshot(root: &Path) -> std::io::Result<TreeSnapshot> {
    let mut entries = TreeSnapshot::new();
    collect(root, Path::new(""), &mut entries)?;
    Ok(entries)
}

fn collect(dir: &Path, relative: &Path, entries: &mut TreeSnapshot) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let relative = relative.join(entry.file_name());
        let file_type = fs::symlink_metadata(&path)?.file_type();

        if file_type.is_dir() {
            entries.insert(relative.clone(), SnapshotEntry::Directory);
            collect(&path, &relative, entries)?;
        } else if file_type.is_file() {
            entries.insert(relative, SnapshotEntry::File(fs::read(&path)?));
        } else {
            entries.insert(relative, SnapshotEntry::Other);
        }
    }
    Ok(())
}

/// Create a small nested tree and return the relative file paths written
pub fn create_sample_tree(root: &Path) -> Vec<&'static str> {
    let files = [
        ("small.txt", 1024),
        ("medium.bin", 64 * 1024),
        ("subdir1/file1.txt", 2048),
        ("subdir2/file2.txt", 4096),
        ("subdir1/nested/file3.bin", 8192 + 3),
    ];

    for (relative, size) in files {
        write_file(root, relative, &generate_test_data(size, TestDataPattern::Realistic));
    }
    make_dir(root, "empty");

    files.iter().map(|(relative, _)| *relative).collect()
}

/// A generated directory tree for property tests
///
/// File names (`fN.txt`) and directory names (`dN`) never collide, so two
/// generated trees can never disagree about the kind of an entry.
#[derive(Debug, Clone)]
pub struct TreeSpec {
    /// Relative file paths and their content
    pub files: BTreeMap<String, Vec<u8>>,
    /// Relative directory paths that exist even without files
    pub dirs: BTreeSet<String>,
}

impl TreeSpec {
    /// Write the tree below `root`
    pub fn materialize(&self, root: &Path) {
        for dir in &self.dirs {
            make_dir(root, dir);
        }
        for (relative, content) in &self.files {
            write_file(root, relative, content);
        }
    }
}

fn dir_chain() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec((0u8..3).prop_map(|i| format!("d{}", i)), 0..3)
}

fn file_path() -> impl Strategy<Value = String> {
    (dir_chain(), 0u8..4).prop_map(|(mut parts, file)| {
        parts.push(format!("f{}.txt", file));
        parts.join("/")
    })
}

/// Strategy producing small trees with frequently equal file contents
pub fn tree_strategy() -> impl Strategy<Value = TreeSpec> {
    let files = proptest::collection::btree_map(
        file_path(),
        proptest::collection::vec(0u8..4, 0..8),
        0..12,
    );
    let dirs = proptest::collection::btree_set(
        dir_chain()
            .prop_filter("a directory needs a name", |parts| !parts.is_empty())
            .prop_map(|parts| parts.join("/")),
        0..4,
    );

    (files, dirs).prop_map(|(files, dirs)| TreeSpec { files, dirs })
}

/// Kinds of the action events in report order
pub fn action_kinds(reporter: &MemoryReporter) -> Vec<EventKind> {
    reporter.actions().into_iter().map(|event| event.kind).collect()
}

/// Whether no creation or update was reported after the first deletion
pub fn deletions_come_last(reporter: &MemoryReporter) -> bool {
    let kinds = action_kinds(reporter);
    match kinds.iter().position(|kind| is_deletion(*kind)) {
        Some(first) => kinds[first..].iter().all(|kind| is_deletion(*kind)),
        None => true,
    }
}

fn is_deletion(kind: EventKind) -> bool {
    matches!(kind, EventKind::FileDeleted | EventKind::DirectoryDeleted)
}

/// Whether this process is actually denied access to a mode-000 file
///
/// False when running with elevated privileges, where permission-based
/// failure tests cannot fail anything.
#[cfg(unix)]
pub fn permissions_enforced(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    let probe = dir.join(".permission-probe");
    if fs::write(&probe, b"probe").is_err() {
        return false;
    }
    let enforced = fs::set_permissions(&probe, fs::Permissions::from_mode(0o000)).is_ok()
        && fs::read(&probe).is_err();
    let _ = fs::set_permissions(&probe, fs::Permissions::from_mode(0o644));
    let _ = fs::remove_file(&probe);
    enforced
}
