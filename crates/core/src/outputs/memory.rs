//! In-memory output store.

use super::{OutputEntry, OutputStore};
use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Stored {
    content: Vec<u8>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: RwLock<HashMap<String, Stored>>,
    saves: AtomicUsize,
}

/// Output store backed by an in-memory map. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutputs {
    inner: Arc<Inner>,
}

impl MemoryOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an output as if it had been saved at `last_modified`.
    pub async fn insert(&self, name: &str, content: &[u8], last_modified: DateTime<Utc>) {
        let mut entries = self.inner.entries.write().await;
        entries.insert(name.to_string(), Stored { content: content.to_vec(), last_modified });
    }

    /// Number of successful saves made through entry handles.
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }
}

impl OutputStore for MemoryOutputs {
    fn entry(&self, name: &str) -> Box<dyn OutputEntry> {
        Box::new(MemoryOutputEntry { inner: self.inner.clone(), name: name.to_string() })
    }
}

struct MemoryOutputEntry {
    inner: Arc<Inner>,
    name: String,
}

#[async_trait]
impl OutputEntry for MemoryOutputEntry {
    async fn save(&self, content: &[u8]) -> Result<(), Error> {
        let mut entries = self.inner.entries.write().await;
        entries.insert(self.name.clone(), Stored { content: content.to_vec(), last_modified: Utc::now() });
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.inner.entries.read().await.get(&self.name).map(|s| s.last_modified)
    }

    async fn read(&self) -> Result<Vec<u8>, Error> {
        self.inner
            .entries
            .read()
            .await
            .get(&self.name)
            .map(|s| s.content.clone())
            .ok_or_else(|| {
                Error::io(
                    &self.name,
                    "read output",
                    std::io::Error::new(std::io::ErrorKind::NotFound, "output has not been written"),
                )
            })
    }
}
