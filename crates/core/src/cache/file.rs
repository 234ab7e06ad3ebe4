//! File-backed cache store.

use super::fs::{WriteOptions, create_store_dir, file_last_modified, read_entry, write_atomic};
use super::{CacheEntry, CacheStore, compute_cache_key};
use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Cache directories are private to the user running the pipeline.
const CACHE_DIR_MODE: u32 = 0o700;

/// Cache store keeping one file per source in a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Open a cache rooted at `path`, creating the directory if it does not
    /// exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        create_store_dir(&path, CACHE_DIR_MODE).await?;
        tracing::debug!("opened cache at {}", path.display());
        Ok(Self { path })
    }

    /// Typed counterpart of [`CacheStore::entry`].
    pub fn file_entry(&self, source: &str) -> FileCacheEntry {
        FileCacheEntry { path: self.path.join(compute_cache_key(source)) }
    }
}

impl CacheStore for FileCache {
    fn entry(&self, source: &str) -> Box<dyn CacheEntry> {
        Box::new(self.file_entry(source))
    }
}

/// A cached source stored as a single file.
#[derive(Debug, Clone)]
pub struct FileCacheEntry {
    path: PathBuf,
}

#[async_trait]
impl CacheEntry for FileCacheEntry {
    async fn write(&self, content: &[u8], last_modified: DateTime<Utc>) -> Result<(), Error> {
        let options = WriteOptions { modified: Some(last_modified), mode: None };
        write_atomic(&self.path, content, options).await
    }

    async fn last_modified(&self) -> Option<DateTime<Utc>> {
        file_last_modified(&self.path).await
    }

    async fn read(&self) -> Result<Vec<u8>, Error> {
        read_entry(&self.path, "read cache entry").await
    }
}
