//! Content fingerprints for files and directory trees
//!
//! A file's fingerprint is the BLAKE3 digest of its bytes, read in
//! [`CHUNK_SIZE`] chunks so memory stays bounded regardless of file size.
//! A directory's fingerprint digests, for every immediate child in
//! lexicographic name order, the child's name bytes followed by the child's
//! own fingerprint. Any byte change anywhere below a directory therefore
//! changes the fingerprint of every ancestor.

use crate::cache::FingerprintCache;
use foldersync_types::{EntryKind, Error, Result};
use futures::future::{BoxFuture, FutureExt};
use std::ffi::OsString;
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Read size used when streaming file content through the digest
pub const CHUNK_SIZE: usize = 4096;

/// Content-derived digest used for change detection
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to a lowercase hex string
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl From<blake3::Hash> for Fingerprint {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Fingerprint({})", &hex[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Computes fingerprints, optionally reusing cached file digests
#[derive(Debug, Default)]
pub struct Fingerprinter {
    cache: Option<FingerprintCache>,
}

impl Fingerprinter {
    /// Create a fingerprinter that hashes everything fresh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fingerprinter backed by a file fingerprint cache
    pub fn with_cache() -> Self {
        Self {
            cache: Some(FingerprintCache::new()),
        }
    }

    /// The cache, if enabled
    pub fn cache(&self) -> Option<&FingerprintCache> {
        self.cache.as_ref()
    }

    /// Mutable access to the cache, if enabled
    pub fn cache_mut(&mut self) -> Option<&mut FingerprintCache> {
        self.cache.as_mut()
    }

    /// Fingerprint a file or directory.
    ///
    /// Fails with [`Error::EntryVanished`] if `path` no longer exists and with
    /// [`Error::UnsupportedEntryKind`] if it is neither a regular file nor a
    /// directory. Symlinks are never followed.
    pub fn fingerprint<'a>(&'a mut self, path: &'a Path) -> BoxFuture<'a, Result<Fingerprint>> {
        async move {
            let metadata = fs::symlink_metadata(path)
                .await
                .map_err(|e| Error::io_at("inspect", path, e))?;

            match EntryKind::from_file_type(&metadata.file_type()) {
                EntryKind::File => self.fingerprint_file(path, &metadata).await,
                EntryKind::Directory => self.fingerprint_directory(path).await,
                EntryKind::Other => Err(Error::unsupported(path)),
            }
        }
        .boxed()
    }

    async fn fingerprint_file(&mut self, path: &Path, metadata: &Metadata) -> Result<Fingerprint> {
        let size = metadata.len();
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        if let Some(cache) = &mut self.cache {
            if let Some(fingerprint) = cache.get(path, size, modified) {
                return Ok(fingerprint);
            }
        }

        let fingerprint = hash_file(path).await?;

        if let Some(cache) = &mut self.cache {
            cache.store(path, size, modified, fingerprint);
        }

        Ok(fingerprint)
    }

    async fn fingerprint_directory(&mut self, path: &Path) -> Result<Fingerprint> {
        let children = sorted_children(path).await?;
        let mut hasher = blake3::Hasher::new();

        for (name, child) in children {
            match self.fingerprint(&child).await {
                Ok(fingerprint) => {
                    hasher.update(name.as_encoded_bytes());
                    hasher.update(fingerprint.as_bytes());
                }
                Err(e @ (Error::EntryVanished { .. } | Error::UnsupportedEntryKind { .. })) => {
                    warn!("Excluded from fingerprint of '{}': {}", path.display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(hasher.finalize().into())
    }
}

/// Fingerprint a file or directory without caching
pub async fn fingerprint<P: AsRef<Path>>(path: P) -> Result<Fingerprint> {
    Fingerprinter::new().fingerprint(path.as_ref()).await
}

/// Stream a file's content through BLAKE3 in fixed-size chunks
pub async fn hash_file<P: AsRef<Path>>(path: P) -> Result<Fingerprint> {
    let path = path.as_ref();
    let mut file = fs::File::open(path)
        .await
        .map_err(|e| Error::io_at("open", path, e))?;

    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .await
            .map_err(|e| Error::io_at("read", path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    debug!("Hashed {} bytes of '{}'", total, path.display());
    Ok(hasher.finalize().into())
}

/// Immediate children of `dir`, sorted lexicographically by name
pub(crate) async fn sorted_children(dir: &Path) -> Result<Vec<(OsString, PathBuf)>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| Error::io_at("read directory", dir, e))?;

    let mut children = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_at("read directory", dir, e))?
    {
        children.push((entry.file_name(), entry.path()));
    }

    children.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(children)
}
