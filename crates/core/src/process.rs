//! Output processing: re-derive stale outputs from cached sources.
//!
//! ### Staleness
//! An output is up to date when both it and its source's cache entry have a
//! recorded time and the output's time is not earlier than the cache's.
//! Equal times count as up to date. The output time is the wall clock of its
//! last save while the cache time is the source-reported `Last-Modified`;
//! the comparison is kept exactly as that, skew included.
//!
//! ### Transform chain
//! Transforms run in declared order, each consuming the previous result.
//! Every resolved transform is released when the chain finishes, fails, or
//! exits early, and nothing is written unless the whole chain succeeded.

use crate::cache::CacheStore;
use crate::outputs::OutputStore;
use crate::pool::WorkerPool;
use crate::transform::{TransformGuard, TransformProvider};
use crate::{Error, ItemError, Output, Stage};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What happened to a single output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The source has not changed since the output was last written.
    UpToDate,
    /// The output was regenerated and saved.
    Written { bytes: usize },
}

/// Returns true when an output written at `output` is current with respect to
/// a source recorded at `cache`.
pub fn is_up_to_date(output: Option<DateTime<Utc>>, cache: Option<DateTime<Utc>>) -> bool {
    match (output, cache) {
        (Some(output), Some(cache)) => output >= cache,
        _ => false,
    }
}

/// Runs the transforms for a single output if its source has changed.
pub async fn process_output(
    output: &Output, cache: &dyn CacheStore, transforms: &dyn TransformProvider, outputs: &dyn OutputStore,
) -> Result<ProcessOutcome, Error> {
    tracing::info!("Processing {}", output.name);

    let output_entry = outputs.entry(&output.name);
    let cache_entry = cache.entry(&output.source);
    let output_last_modified = output_entry.last_modified().await;
    let cache_last_modified = cache_entry.last_modified().await;

    if is_up_to_date(output_last_modified, cache_last_modified) {
        tracing::debug!("Source hasn't changed for {} since the last transformation", output.name);
        return Ok(ProcessOutcome::UpToDate);
    }

    let mut content = match cache_entry.read().await {
        Ok(content) => content,
        Err(e) if e.is_not_found() => return Err(Error::NotCached(output.source.clone())),
        Err(e) => return Err(e),
    };

    let mut guards = Vec::with_capacity(output.transforms.len());
    for name in &output.transforms {
        let mut guard = TransformGuard::new(name.as_str(), transforms.get(name).await?);

        tracing::debug!("Running transform {} for {}", name, output.name);
        content = guard.process(&content).await?;

        // Released together once the chain is done, or on any early return.
        guards.push(guard);
    }

    tracing::info!("Writing output for {}", output.name);
    output_entry.save(&content).await?;

    Ok(ProcessOutcome::Written { bytes: content.len() })
}

/// Runs the transforms for every output, at most `limit` at a time.
///
/// Returns one error per failed output; a failure never affects other outputs.
pub async fn process(
    outputs: &[Output], cache: Arc<dyn CacheStore>, transforms: Arc<dyn TransformProvider>,
    store: Arc<dyn OutputStore>, limit: usize,
) -> Vec<ItemError> {
    let pool = WorkerPool::new(Stage::Process, limit);

    pool.run(outputs.to_vec(), move |output: Output| {
        let cache = cache.clone();
        let transforms = transforms.clone();
        let store = store.clone();
        async move {
            process_output(&output, cache.as_ref(), transforms.as_ref(), store.as_ref())
                .await
                .map(|_| ())
        }
    })
    .await
}
