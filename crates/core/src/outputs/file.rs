//! File-backed output store.

use super::{OutputEntry, OutputStore};
use crate::Error;
use crate::cache::fs::{WriteOptions, create_store_dir, file_last_modified, read_entry, write_atomic};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Outputs are likely published by a web server, so others need read access.
const OUTPUT_DIR_MODE: u32 = 0o755;
const OUTPUT_FILE_MODE: u32 = 0o644;

/// Output store writing each output to a file named after it.
#[derive(Debug, Clone)]
pub struct FileOutputs {
    path: PathBuf,
}

impl FileOutputs {
    /// Open an output directory, creating it if it does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        create_store_dir(&path, OUTPUT_DIR_MODE).await?;
        Ok(Self { path })
    }

    pub fn file_entry(&self, name: &str) -> FileOutputEntry {
        FileOutputEntry { path: self.path.join(name) }
    }
}

impl OutputStore for FileOutputs {
    fn entry(&self, name: &str) -> Box<dyn OutputEntry> {
        Box::new(self.file_entry(name))
    }
}

#[derive(Debug, Clone)]
pub struct FileOutputEntry {
    path: PathBuf,
}

#[async_trait]
impl OutputEntry for FileOutputEntry {
    async fn save(&self, content: &[u8]) -> Result<(), Error> {
        let options = WriteOptions { modified: None, mode: Some(OUTPUT_FILE_MODE) };
        write_atomic(&self.path, content, options).await
    }

    async fn last_modified(&self) -> Option<DateTime<Utc>> {
        file_last_modified(&self.path).await
    }

    async fn read(&self) -> Result<Vec<u8>, Error> {
        read_entry(&self.path, "read output").await
    }
}
