//! Fetch phase: refresh the cache for every distinct source.
//!
//! Each source is requested conditionally against its cache entry. New
//! content is stored together with the time the source says it was last
//! modified (`Last-Modified`, falling back to `Date`), never the local
//! fetch time, so the next run's `If-Modified-Since` and the processor's
//! staleness check both see the source's own clock.

use crate::fetch::{FetchOutcome, SourceFetcher, parse_http_date};
use chrono::{DateTime, Utc};
use feedtr_core::{CacheStore, Error, ItemError, Stage, WorkerPool};
use reqwest::header::{self, HeaderMap};
use std::collections::BTreeSet;
use std::sync::Arc;

/// What happened to a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// New content was stored.
    Updated { bytes: usize, last_modified: DateTime<Utc> },
    /// The cached copy is still current.
    NotModified,
}

/// The modification time a response reports for its content.
///
/// Uses `Last-Modified`, or `Date` when that is missing or empty.
pub fn response_last_modified(headers: &HeaderMap) -> Result<DateTime<Utc>, Error> {
    let non_empty = move |name: header::HeaderName| headers.get(name).filter(|value| !value.is_empty());

    let value = non_empty(header::LAST_MODIFIED)
        .or_else(|| non_empty(header::DATE))
        .ok_or_else(|| Error::Freshness("missing Last-Modified and Date headers".into()))?;

    let text = value
        .to_str()
        .map_err(|e| Error::Freshness(format!("unreadable date header: {}", e)))?;

    parse_http_date(text).ok_or_else(|| Error::Freshness(format!("invalid date {:?}", text)))
}

/// Fetches a source and saves any new content to the cache.
pub async fn fetch_source(
    source: &str, cache: &dyn CacheStore, fetcher: &dyn SourceFetcher,
) -> Result<FetchStatus, Error> {
    let entry = cache.entry(source);
    let cached_last_modified = entry.last_modified().await;

    match fetcher.fetch(source, cached_last_modified).await? {
        FetchOutcome::NotModified => {
            tracing::debug!("{} not modified since {:?}", source, cached_last_modified);
            Ok(FetchStatus::NotModified)
        }
        FetchOutcome::Modified(response) => {
            let last_modified = response_last_modified(&response.headers)?;
            entry.write(&response.bytes, last_modified).await?;
            tracing::debug!("cached {} ({} bytes, last modified {})", source, response.bytes.len(), last_modified);
            Ok(FetchStatus::Updated { bytes: response.bytes.len(), last_modified })
        }
    }
}

/// Fetches every source, at most `limit` at a time, storing results in the
/// cache.
///
/// Sources are deduplicated first. Returns one error per failed source once
/// all of them have been attempted.
pub async fn fetch_sources(
    sources: impl IntoIterator<Item = String>, cache: Arc<dyn CacheStore>, fetcher: Arc<dyn SourceFetcher>,
    limit: usize,
) -> Vec<ItemError> {
    let sources: BTreeSet<String> = sources.into_iter().collect();
    let pool = WorkerPool::new(Stage::Fetch, limit);

    pool.run(sources.into_iter().collect(), move |source: String| {
        let cache = cache.clone();
        let fetcher = fetcher.clone();
        async move {
            fetch_source(&source, cache.as_ref(), fetcher.as_ref())
                .await
                .map(|_| ())
        }
    })
    .await
}
