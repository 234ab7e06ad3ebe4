//! The two-phase run: refresh every source, then regenerate stale outputs.
//!
//! Processing only starts once the fetch phase has finished for every
//! source, and is skipped entirely if any fetch failed.

use anyhow::{Context, Result, bail};
use feedtr_client::{FetchClient, FetchConfig, fetch_sources};
use feedtr_core::{AppConfig, FileCache, FileOutputs, FileTransforms, ItemError, process};
use std::sync::Arc;

/// Logs every per-item error and fails if there were any.
fn check_all(phase: &str, errors: &[ItemError]) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }

    for err in errors {
        tracing::error!(item = %err.item, "{}", err);
    }
    bail!("{} failed for {} item(s)", phase, errors.len())
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let cache = FileCache::open(&config.cache_dir)
        .await
        .with_context(|| format!("opening cache {}", config.cache_dir.display()))?;
    let cache = Arc::new(cache);

    let sources = config.distinct_sources();
    tracing::info!(sources = sources.len(), outputs = config.outputs.len(), "Fetching sources");

    let client = FetchClient::new(FetchConfig::from(config))?;
    let errors = fetch_sources(sources, cache.clone(), Arc::new(client), config.fetch_limit).await;
    check_all("fetch", &errors)?;

    let transforms = FileTransforms::new(&config.transforms_dir, &config.xslt_command);
    let outputs = FileOutputs::open(&config.outputs_dir)
        .await
        .with_context(|| format!("opening outputs {}", config.outputs_dir.display()))?;

    tracing::info!(outputs = config.outputs.len(), "Processing outputs");
    let errors = process(&config.outputs, cache, Arc::new(transforms), Arc::new(outputs), config.process_limit).await;
    check_all("process", &errors)?;

    tracing::info!("Done");
    Ok(())
}
