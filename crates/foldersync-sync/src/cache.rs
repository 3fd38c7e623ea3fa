//! In-memory fingerprint caching across synchronization passes
//!
//! Entries are keyed by absolute file path and are only trusted while the
//! file's size and modification time are exactly what they were when the
//! digest was computed. Nothing is persisted.

use crate::fingerprint::Fingerprint;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Cache entry for a file fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// File size when the fingerprint was computed
    pub size: u64,
    /// Modification time when the fingerprint was computed
    pub modified: SystemTime,
    /// The cached fingerprint
    pub fingerprint: Fingerprint,
}

impl CacheEntry {
    /// Check if this cache entry is still valid for the given file metadata
    pub fn is_valid(&self, size: u64, modified: SystemTime) -> bool {
        self.size == size && self.modified == modified
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache entries
    pub total_entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that required hashing
    pub misses: u64,
}

/// File fingerprint cache
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: HashMap<PathBuf, CacheEntry>,
    seen: HashSet<PathBuf>,
    hits: u64,
    misses: u64,
}

impl FingerprintCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a fingerprint if one is cached for exactly this size and mtime
    pub fn get<P: AsRef<Path>>(
        &mut self,
        path: P,
        size: u64,
        modified: SystemTime,
    ) -> Option<Fingerprint> {
        let path = path.as_ref();
        self.seen.insert(path.to_path_buf());

        match self.entries.get(path) {
            Some(entry) if entry.is_valid(size, modified) => {
                self.hits += 1;
                debug!("Cache hit for: {}", path.display());
                Some(entry.fingerprint)
            }
            Some(_) => {
                self.entries.remove(path);
                self.misses += 1;
                debug!("Cache entry outdated for: {}", path.display());
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a fingerprint computed for the given size and mtime
    pub fn store<P: AsRef<Path>>(
        &mut self,
        path: P,
        size: u64,
        modified: SystemTime,
        fingerprint: Fingerprint,
    ) {
        let path = path.as_ref().to_path_buf();
        self.seen.insert(path.clone());
        self.entries.insert(
            path,
            CacheEntry {
                size,
                modified,
                fingerprint,
            },
        );
    }

    /// Remove a path from the cache
    pub fn invalidate<P: AsRef<Path>>(&mut self, path: P) {
        self.entries.remove(path.as_ref());
    }

    /// Forget which paths were looked up; call at the start of a pass
    pub fn begin_pass(&mut self) {
        self.seen.clear();
    }

    /// Drop entries for paths not looked up since [`Self::begin_pass`]
    pub fn prune_unseen(&mut self) -> usize {
        let before = self.entries.len();
        let seen = &self.seen;
        self.entries.retain(|path, _| seen.contains(path));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Pruned {} stale cache entries", removed);
        }
        removed
    }

    /// Clear all cache entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
