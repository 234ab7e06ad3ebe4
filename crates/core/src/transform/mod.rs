//! Named content transforms applied to cached feeds.
//!
//! A [`TransformProvider`] resolves transform names to [`Transform`]
//! instances. Instances may hold resources, so every resolved transform is
//! wrapped in a [`TransformGuard`] which releases it exactly once when the
//! guard goes out of scope, whichever way the chain exits.

mod file;

pub use file::{CommandTransform, FileTransforms};

use crate::Error;
use async_trait::async_trait;

/// A transformation that can be run on a feed.
#[async_trait]
pub trait Transform: Send {
    /// Runs the transformation on `input`, returning the transformed bytes.
    async fn process(&mut self, input: &[u8]) -> Result<Vec<u8>, Error>;

    /// Releases resources held by the transform. Called exactly once by
    /// [`TransformGuard`].
    fn close(&mut self) {}
}

/// A source of [`Transform`] instances.
#[async_trait]
pub trait TransformProvider: Send + Sync {
    /// Resolves a transform by name.
    ///
    /// Fails with [`Error::TransformResolution`] if the name does not refer to
    /// a usable transform.
    async fn get(&self, name: &str) -> Result<Box<dyn Transform>, Error>;
}

/// Owns a resolved transform and closes it on drop.
pub struct TransformGuard {
    name: String,
    transform: Option<Box<dyn Transform>>,
}

impl TransformGuard {
    pub fn new(name: impl Into<String>, transform: Box<dyn Transform>) -> Self {
        Self { name: name.into(), transform: Some(transform) }
    }

    pub async fn process(&mut self, input: &[u8]) -> Result<Vec<u8>, Error> {
        match self.transform.as_mut() {
            Some(transform) => transform.process(input).await,
            None => Err(Error::TransformExecution { name: self.name.clone(), reason: "transform was closed".into() }),
        }
    }
}

impl Drop for TransformGuard {
    fn drop(&mut self) {
        if let Some(mut transform) = self.transform.take() {
            transform.close();
            tracing::trace!("closed transform {}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transform for Counting {
        async fn process(&mut self, input: &[u8]) -> Result<Vec<u8>, Error> {
            Ok(input.iter().rev().copied().collect())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_guard_processes_and_closes_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut guard = TransformGuard::new("reverse", Box::new(Counting { closes: closes.clone() }));

        assert_eq!(guard.process(b"abc").await.unwrap(), b"cba");
        assert_eq!(guard.process(b"xy").await.unwrap(), b"yx");
        assert_eq!(closes.load(Ordering::SeqCst), 0);

        drop(guard);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
