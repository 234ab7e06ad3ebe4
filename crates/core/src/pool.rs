//! Bounded worker pool with per-item error collection.
//!
//! Up to `min(limit, items)` workers drain a shared queue, each running one
//! item to completion before claiming the next. Failures are sent to a single
//! collector task owned by the pool invocation, so nothing is shared between
//! separate runs. Every item is attempted before [`WorkerPool::run`] returns.
//! Neither processing order nor error order is preserved. Failures are
//! returned rather than logged here.

use crate::{Error, ItemError, Stage};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

/// Default cap on concurrent fetches and concurrent output runs.
pub const DEFAULT_LIMIT: usize = 100;

/// Something the pool can report failures against.
pub trait PoolItem: Send + 'static {
    /// Identity used to tag failures for this item.
    fn id(&self) -> &str;
}

impl PoolItem for String {
    fn id(&self) -> &str {
        self
    }
}

impl PoolItem for crate::Output {
    fn id(&self) -> &str {
        &self.name
    }
}

/// A fixed-size pool of tokio tasks applying one operation to many items.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    stage: Stage,
    limit: usize,
}

impl WorkerPool {
    /// A limit of 0 is treated as 1.
    pub fn new(stage: Stage, limit: usize) -> Self {
        Self { stage, limit: limit.max(1) }
    }

    /// Number of workers that would be started for `items` items.
    pub fn workers_for(&self, items: usize) -> usize {
        self.limit.min(items)
    }

    /// Apply `op` to every item and return the failures.
    ///
    /// Each item runs in its own task so a panic is reported as a
    /// [`Error::WorkerFailed`] for that item without stopping its worker.
    pub async fn run<T, F, Fut>(&self, items: Vec<T>, op: F) -> Vec<ItemError>
    where
        T: PoolItem,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let workers = self.workers_for(items.len());
        if workers == 0 {
            return Vec::new();
        }

        tracing::debug!("{} {} items with {} workers", self.stage, items.len(), workers);

        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let op = Arc::new(op);
        let (tx, mut rx) = mpsc::unbounded_channel::<ItemError>();

        let collector = tokio::spawn(async move {
            let mut errors = Vec::new();
            while let Some(err) = rx.recv().await {
                errors.push(err);
            }
            errors
        });

        let mut join_set = JoinSet::new();
        for _ in 0..workers {
            let queue = queue.clone();
            let op = op.clone();
            let tx = tx.clone();
            let stage = self.stage;

            join_set.spawn(async move {
                loop {
                    // NOTE: The queue lock is released before the item runs.
                    let Some(item) = queue.lock().await.pop_front() else {
                        break;
                    };
                    let id = item.id().to_string();

                    let result = match tokio::spawn(op(item)).await {
                        Ok(result) => result,
                        Err(e) => Err(Error::WorkerFailed(e.to_string())),
                    };

                    if let Err(source) = result {
                        // The collector outlives every sender.
                        let _ = tx.send(ItemError::new(stage, id, source));
                    }
                }
            });
        }
        drop(tx);

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("{} worker terminated: {}", self.stage, e);
            }
        }

        match collector.await {
            Ok(errors) => errors,
            Err(e) => {
                tracing::error!("{} error collector terminated: {}", self.stage, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn items(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item-{i}")).collect()
    }

    #[test]
    fn test_workers_for() {
        let pool = WorkerPool::new(Stage::Fetch, 3);
        assert_eq!(pool.workers_for(10), 3);
        assert_eq!(pool.workers_for(2), 2);
        assert_eq!(pool.workers_for(0), 0);
        assert_eq!(WorkerPool::new(Stage::Fetch, 0).workers_for(5), 1);
    }

    #[tokio::test]
    async fn test_empty_items() {
        let pool = WorkerPool::new(Stage::Fetch, 3);
        let errors = pool.run(Vec::<String>::new(), |_item| async { Ok(()) }).await;
        assert!(errors.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_item_attempted_once_within_limit() {
        let attempts = Arc::new(std::sync::Mutex::new(HashMap::<String, usize>::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let pool = WorkerPool::new(Stage::Fetch, 3);
        let errors = {
            let attempts = attempts.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            pool.run(items(10), move |item: String| {
                let attempts = attempts.clone();
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);

                    *attempts.lock().unwrap().entry(item.clone()).or_default() += 1;
                    if item.ends_with('7') || item.ends_with('3') {
                        Err(Error::UnexpectedStatus(format!("{item} failed")))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
        };

        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 10);
        assert!(attempts.values().all(|&n| n == 1));
        assert!(peak.load(Ordering::SeqCst) <= 3);

        assert_eq!(errors.len(), 2);
        let mut failed: Vec<_> = errors.iter().map(|e| e.item.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["item-3", "item-7"]);
        assert!(errors.iter().all(|e| e.stage == Stage::Fetch));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(Stage::Process, 1);

        let errors = {
            let completed = completed.clone();
            pool.run(items(5), move |_item: String| {
                let completed = completed.clone();
                async move {
                    completed.fetch_add(1, Ordering::SeqCst);
                    Err(Error::NotCached("never fetched".into()))
                }
            })
            .await
        };

        assert_eq!(completed.load(Ordering::SeqCst), 5);
        assert_eq!(errors.len(), 5);
    }

    #[tokio::test]
    async fn test_panic_is_reported_for_item() {
        let pool = WorkerPool::new(Stage::Process, 1);

        let errors = pool
            .run(items(3), |item: String| async move {
                if item == "item-1" {
                    panic!("transform blew up");
                }
                Ok(())
            })
            .await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].item, "item-1");
        assert!(matches!(errors[0].source, Error::WorkerFailed(_)));
    }
}
