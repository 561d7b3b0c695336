//! File-based figure cache.
//!
//! Directory layout:
//! ```text
//! {root}/
//! +-- 3f786850e387550fdab836ed7e6dc881de23001b   # one figure, no extension
//! +-- 89e6c98d92887913cadf06b2adb97f26cde4849b
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::Fingerprint;

/// Figure cache rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FigureCache {
    root: PathBuf,
}

impl FigureCache {
    /// Create a cache rooted at `root`. Nothing is touched on disk until
    /// [`ensure_root`](Self::ensure_root) is called.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for `key`. Pure: does not check the file system.
    #[must_use]
    pub fn path_for<K: Fingerprint + ?Sized>(&self, key: &K) -> PathBuf {
        self.root.join(key.fingerprint())
    }

    /// Whether an artifact exists at `path`.
    #[must_use]
    pub fn is_present(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Create the cache root and its parents if absent.
    ///
    /// Safe to call repeatedly and from concurrent processes: a directory that
    /// appears between the check and the creation counts as success.
    pub fn ensure_root(&self) -> io::Result<()> {
        match fs::create_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && self.root.is_dir() => {
                tracing::debug!("cache root appeared concurrently: {}", self.root.display());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
