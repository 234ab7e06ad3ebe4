//! In-memory cache store.

use super::{CacheEntry, CacheStore};
use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Stored {
    content: Vec<u8>,
    last_modified: DateTime<Utc>,
}

type Entries = Arc<RwLock<HashMap<String, Stored>>>;

/// Cache store backed by a shared in-memory map, keyed by source identifier.
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Entries,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sources with stored content.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn entry(&self, source: &str) -> Box<dyn CacheEntry> {
        Box::new(MemoryCacheEntry { entries: self.entries.clone(), key: source.to_string() })
    }
}

/// Handle to one source in a [`MemoryCache`].
#[derive(Debug, Clone)]
pub struct MemoryCacheEntry {
    entries: Entries,
    key: String,
}

#[async_trait]
impl CacheEntry for MemoryCacheEntry {
    async fn write(&self, content: &[u8], last_modified: DateTime<Utc>) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        entries.insert(self.key.clone(), Stored { content: content.to_vec(), last_modified });
        Ok(())
    }

    async fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.entries.read().await.get(&self.key).map(|s| s.last_modified)
    }

    async fn read(&self) -> Result<Vec<u8>, Error> {
        self.entries
            .read()
            .await
            .get(&self.key)
            .map(|s| s.content.clone())
            .ok_or_else(|| {
                Error::io(
                    &self.key,
                    "read cache entry",
                    std::io::Error::new(std::io::ErrorKind::NotFound, "entry has not been written"),
                )
            })
    }
}
