//! Storage for transformed feed outputs.
//!
//! Unlike the source cache, an output's modification time is the wall-clock
//! time it was last saved. Comparing it with the cache entry's source-reported
//! time is how the processor decides whether an output is stale.

mod file;
mod memory;

use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use file::{FileOutputEntry, FileOutputs};
pub use memory::MemoryOutputs;

/// The output location for transformed feeds.
pub trait OutputStore: Send + Sync {
    /// Returns the entry for an output name. A handle is always returned.
    fn entry(&self, name: &str) -> Box<dyn OutputEntry>;
}

/// Handle to a single transformed output.
#[async_trait]
pub trait OutputEntry: Send + Sync {
    /// Atomically stores `content`, stamping the current time.
    async fn save(&self, content: &[u8]) -> Result<(), Error>;

    /// Time of the last save, or `None` if the output was never written.
    async fn last_modified(&self) -> Option<DateTime<Utc>>;

    /// Stored content. Fails if the output was never written.
    async fn read(&self) -> Result<Vec<u8>, Error>;
}
