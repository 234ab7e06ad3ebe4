//! Core types and shared functionality for feedtr.
//!
//! This crate provides:
//! - Source cache and output stores (filesystem and in-memory)
//! - Transform resolution and the output processor
//! - The bounded worker pool shared by the fetch and process phases
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod outputs;
pub mod pool;
pub mod process;
pub mod transform;

pub use cache::{CacheEntry, CacheStore, FileCache, MemoryCache};
pub use config::{AppConfig, ConfigError, Output};
pub use error::{Error, ItemError, Stage};
pub use outputs::{FileOutputs, MemoryOutputs, OutputEntry, OutputStore};
pub use pool::{DEFAULT_LIMIT, WorkerPool};
pub use process::{ProcessOutcome, is_up_to_date, process, process_output};
pub use transform::{FileTransforms, Transform, TransformGuard, TransformProvider};
