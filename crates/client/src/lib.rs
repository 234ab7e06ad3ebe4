//! Client code for feedtr.
//!
//! This crate provides the conditional HTTP fetch client and the fetch phase
//! that keeps the source cache current.

pub mod fetch;
pub mod sources;

pub use fetch::{FetchClient, FetchConfig, FetchOutcome, FetchResponse, SourceFetcher};
pub use sources::{FetchStatus, fetch_source, fetch_sources, response_last_modified};
