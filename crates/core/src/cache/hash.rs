//! Cache key derivation for feed sources.

use sha2::{Digest, Sha256};

/// Compute the storage key for a source identifier.
///
/// The identifier is hashed verbatim so the same configured source always
/// addresses the same cache entry across runs.
pub fn compute_cache_key(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}
