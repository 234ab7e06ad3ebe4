//! Filesystem helpers shared by the file-backed cache and output stores.
//!
//! Entries are plain files. The file's modification time doubles as the
//! entry's `last_modified`, so there is no separate metadata index.

use crate::Error;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Options applied to the temporary file before it replaces the entry.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriteOptions {
    /// Modification time to stamp; the write time is kept when `None`.
    pub modified: Option<DateTime<Utc>>,
    /// Unix permission bits to apply regardless of the process umask.
    pub mode: Option<u32>,
}

/// Last modified time of the file at `path`, or `None` if it does not exist
/// or its metadata cannot be read.
pub(crate) async fn file_last_modified(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// Read an entry's content.
pub(crate) async fn read_entry(path: &Path, operation: &'static str) -> Result<Vec<u8>, Error> {
    fs::read(path).await.map_err(|e| Error::io(path, operation, e))
}

/// Create a store directory if needed.
pub(crate) async fn create_store_dir(path: &Path, mode: u32) -> Result<(), Error> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    builder
        .create(path)
        .await
        .map_err(|e| Error::io(path, "create store directory", e))
}

/// A fresh hidden sibling of `path`. Unique per call, so it can never name
/// another entry or another in-flight write.
fn temp_path_for(path: &Path) -> PathBuf {
    path.with_file_name(format!(".{}.tmp", Uuid::new_v4()))
}

/// Atomically replace the file at `path` with `content`.
///
/// The content is written to a uniquely named sibling temporary file which is
/// then renamed over the destination, so readers only ever see the old or the
/// new file.
pub(crate) async fn write_atomic(path: &Path, content: &[u8], options: WriteOptions) -> Result<(), Error> {
    let temp_path = temp_path_for(path);

    if let Err(e) = write_temp(&temp_path, content, options).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    match fs::rename(&temp_path, path).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = fs::remove_file(&temp_path).await;
            Err(Error::io(path, "atomic rename", e))
        }
    }
}

async fn write_temp(temp_path: &Path, content: &[u8], options: WriteOptions) -> Result<(), Error> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await
        .map_err(|e| Error::io(temp_path, "create temporary file", e))?;

    file.write_all(content)
        .await
        .map_err(|e| Error::io(temp_path, "write temporary file", e))?;
    file.flush()
        .await
        .map_err(|e| Error::io(temp_path, "flush temporary file", e))?;

    let file = file.into_std().await;
    if let Some(modified) = options.modified {
        file.set_modified(SystemTime::from(modified))
            .map_err(|e| Error::io(temp_path, "set modification time", e))?;
    }
    file.sync_all()
        .map_err(|e| Error::io(temp_path, "sync temporary file", e))?;
    drop(file);

    // The umask applies at create time; set the bits explicitly afterwards.
    #[cfg(unix)]
    if let Some(mode) = options.mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp_path, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| Error::io(temp_path, "set permissions", e))?;
    }

    Ok(())
}
