//! Cover asset cache
//!
//! Covers are stored by item id, at most once per id for the lifetime of the
//! cache. The extractor asks the cache before downloading anything.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Storage for downloaded cover images, keyed by item id
#[async_trait]
pub trait CoverCache: Send + Sync {
    /// Returns true if a cover for `id` is already stored
    async fn contains(&self, id: u64) -> io::Result<bool>;

    /// Stores the cover bytes for `id`
    async fn store(&self, id: u64, bytes: &[u8]) -> io::Result<()>;

    /// Loads the cover bytes for `id`, if present
    async fn load(&self, id: u64) -> io::Result<Option<Vec<u8>>>;
}

/// One file per id inside a directory
#[derive(Debug, Clone)]
pub struct FsCoverCache {
    dir: PathBuf,
}

impl FsCoverCache {
    /// Opens the cache, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: u64) -> PathBuf {
        self.dir.join(id.to_string())
    }
}

#[async_trait]
impl CoverCache for FsCoverCache {
    async fn contains(&self, id: u64) -> io::Result<bool> {
        tokio::fs::try_exists(self.path_for(id)).await
    }

    async fn store(&self, id: u64, bytes: &[u8]) -> io::Result<()> {
        // A cover file is either absent or complete.
        let target = self.path_for(id);
        let partial = self.dir.join(format!("{}.part", id));
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &target).await
    }

    async fn load(&self, id: u64) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// In-memory cache, used by tests
#[derive(Debug, Default)]
pub struct MemoryCoverCache {
    covers: Mutex<HashMap<u64, Vec<u8>>>,
}

impl MemoryCoverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.covers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CoverCache for MemoryCoverCache {
    async fn contains(&self, id: u64) -> io::Result<bool> {
        Ok(self
            .covers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id))
    }

    async fn store(&self, id: u64, bytes: &[u8]) -> io::Result<()> {
        self.covers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, bytes.to_vec());
        Ok(())
    }

    async fn load(&self, id: u64) -> io::Result<Option<Vec<u8>>> {
        Ok(self
            .covers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }
}
