//! Persistent cache of fetched feed sources.
//!
//! Each source identifier maps to one entry holding the raw response body and
//! the modification time the source reported for it. The recorded time is
//! what conditional requests are built from and what output staleness is
//! measured against, so it is never the local fetch time.
//!
//! - [`FileCache`] stores one file per source, named by [`compute_cache_key`],
//!   with the file's mtime set to the source's `Last-Modified`.
//! - [`MemoryCache`] keeps entries in memory for tests and embedding.

mod file;
pub(crate) mod fs;
pub mod hash;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use crate::Error;

pub use file::{FileCache, FileCacheEntry};
pub use hash::compute_cache_key;
pub use memory::{MemoryCache, MemoryCacheEntry};

/// A store of fetched feed sources.
pub trait CacheStore: Send + Sync {
    /// Returns the entry for a source identifier. A handle is always returned,
    /// whether or not anything has been stored for it yet.
    fn entry(&self, source: &str) -> Box<dyn CacheEntry>;
}

/// Handle to the cached state of a single source.
#[async_trait]
pub trait CacheEntry: Send + Sync {
    /// Atomically stores `content`, recording `last_modified` as the entry's
    /// modification time.
    async fn write(&self, content: &[u8], last_modified: DateTime<Utc>) -> Result<(), Error>;

    /// Recorded modification time, or `None` if the entry was never written.
    async fn last_modified(&self) -> Option<DateTime<Utc>>;

    /// Cached content. Fails if the entry was never written.
    async fn read(&self) -> Result<Vec<u8>, Error>;
}
