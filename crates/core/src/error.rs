//! Unified error types for feedtr.
//!
//! Every variant renders with a stable code prefix so per-item failures can be
//! grepped out of the logs regardless of which phase produced them.

use std::fmt;
use std::path::{Path, PathBuf};

/// Unified error types for the fetch and process pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Store read or write failed.
    #[error("IO_ERROR: {operation} {}: {source}", path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Response carried neither a usable Last-Modified nor a Date header.
    #[error("FRESHNESS_ERROR: {0}")]
    Freshness(String),

    /// Remote answered with something other than 200 or 304.
    #[error("UNEXPECTED_STATUS: {0}")]
    UnexpectedStatus(String),

    /// Processing was attempted for a source that has never been fetched.
    #[error("NOT_CACHED: {0}")]
    NotCached(String),

    /// Transform name could not be resolved to a usable transform.
    #[error("TRANSFORM_NOT_FOUND: {name}: {reason}")]
    TransformResolution { name: String, reason: String },

    /// Transform failed while running.
    #[error("TRANSFORM_FAILED: {name}: {reason}")]
    TransformExecution { name: String, reason: String },

    /// Network-level failure talking to a source.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Invalid source URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A worker task panicked or was cancelled while holding an item.
    #[error("WORKER_FAILED: {0}")]
    WorkerFailed(String),
}

impl Error {
    pub fn io(path: impl AsRef<Path>, operation: &'static str, source: std::io::Error) -> Self {
        Error::Io { path: path.as_ref().to_path_buf(), operation, source }
    }

    /// True when the error is an I/O failure caused by a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Pipeline phase an [`ItemError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Process,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => f.write_str("fetching"),
            Stage::Process => f.write_str("processing"),
        }
    }
}

/// A failure for one source or output, tagged with the item it belongs to.
#[derive(Debug, thiserror::Error)]
#[error("error {stage} {item}: {source}")]
pub struct ItemError {
    pub stage: Stage,
    pub item: String,
    #[source]
    pub source: Error,
}

impl ItemError {
    pub fn new(stage: Stage, item: impl Into<String>, source: Error) -> Self {
        Self { stage, item: item.into(), source }
    }
}
