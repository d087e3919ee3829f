//! Content-verified disk cache for modules that cannot load from memory.
//!
//! Layout:
//! ```text
//! <cache_root>/
//!   <file_name>      last payload stored under that name
//! ```
//!
//! There is no namespacing: callers pick collision-free file names. A file
//! is rewritten only when its digest differs from the incoming payload, so
//! repeated stores of the same bytes (from this or another process) leave it
//! untouched. Files outlive the process and are never removed.

use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::digest::ContentDigest;
use crate::error::{Result, StowageError};

/// A flat directory of cached module files.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

/// What `store` did with the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A file with an identical digest was already present.
    Hit,
    /// The file was absent or stale and has been (re)written.
    Written,
}

/// The file currently backing a cache name.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Path of the cached file.
    pub path: PathBuf,
    /// Digest of the cached file's contents.
    pub digest: ContentDigest,
    /// Whether this store hit or wrote.
    pub outcome: CacheOutcome,
}

impl DiskCache {
    /// Create a cache rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskCache { root: root.into() }
    }

    /// Create a cache in the platform temporary directory.
    pub fn temp() -> Self {
        DiskCache::new(std::env::temp_dir())
    }

    /// Get the root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path for `file_name`.
    pub fn path_for(&self, file_name: &str) -> Result<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(file_name)),
            _ => Err(StowageError::InvalidFileName {
                name: file_name.to_string(),
            }),
        }
    }

    /// Digest of the file currently cached under `file_name`, if any.
    pub fn inspect(&self, file_name: &str) -> Result<Option<ContentDigest>> {
        let path = self.path_for(file_name)?;
        if !path.is_file() {
            return Ok(None);
        }
        let file = File::open(&path).map_err(|e| StowageError::IoFailure {
            path: path.clone(),
            detail: format!("opening cached file: {e}"),
        })?;
        let digest = ContentDigest::of_reader(file).map_err(|e| StowageError::IoFailure {
            path,
            detail: format!("reading cached file: {e}"),
        })?;
        Ok(Some(digest))
    }

    /// Make sure the file cached under `file_name` holds `payload`.
    ///
    /// Writes only when the file is missing or its digest differs.
    pub fn store(&self, file_name: &str, payload: &[u8]) -> Result<CacheEntry> {
        let path = self.path_for(file_name)?;
        let digest = ContentDigest::compute(payload);

        if let Some(existing) = self.inspect(file_name)? {
            if existing == digest {
                debug!(path = %path.display(), %digest, "cache hit");
                return Ok(CacheEntry {
                    path,
                    digest,
                    outcome: CacheOutcome::Hit,
                });
            }
            debug!(path = %path.display(), old = %existing, new = %digest, "cached file is stale");
        }

        self.write(&path, payload)?;
        info!(path = %path.display(), %digest, bytes = payload.len(), "wrote cached module");
        Ok(CacheEntry {
            path,
            digest,
            outcome: CacheOutcome::Written,
        })
    }

    // Readers never see a partial file: bytes land in a sibling temp file
    // which is then renamed over the target.
    fn write(&self, path: &Path, payload: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| StowageError::IoFailure {
            path: self.root.clone(),
            detail: format!("creating cache dir: {e}"),
        })?;

        let mut staged =
            tempfile::NamedTempFile::new_in(&self.root).map_err(|e| StowageError::IoFailure {
                path: self.root.clone(),
                detail: format!("creating staging file: {e}"),
            })?;
        staged
            .write_all(payload)
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| StowageError::IoFailure {
                path: staged.path().to_path_buf(),
                detail: format!("writing payload: {e}"),
            })?;
        staged.persist(path).map_err(|e| StowageError::IoFailure {
            path: path.to_path_buf(),
            detail: format!("replacing cached file: {}", e.error),
        })?;
        Ok(())
    }
}
