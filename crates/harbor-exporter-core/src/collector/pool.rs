//! Fixed-size worker pool for intra-group fan-out.
//!
//! Work items go through a bounded queue drained by `size` workers; the caller
//! waits for every worker before the results are returned, in input order.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::CollectError;

#[derive(Debug, Clone, Copy)]
pub struct WorkPool {
    size: usize,
}

impl WorkPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `work` for every item and returns the results in item order.
    ///
    /// The first failure stops workers from starting new items; items already
    /// queued are drained without being processed.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, work: F) -> Result<Vec<T>, CollectError>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CollectError>> + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let (queue_tx, queue_rx) = mpsc::channel::<(usize, I)>(self.size);
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let work = Arc::new(work);
        let failed = Arc::new(AtomicBool::new(false));

        let mut workers = JoinSet::new();
        for _ in 0..self.size.min(total) {
            let queue_rx = Arc::clone(&queue_rx);
            let work = Arc::clone(&work);
            let failed = Arc::clone(&failed);
            workers.spawn(async move {
                let mut done = Vec::new();
                loop {
                    let next = queue_rx.lock().await.recv().await;
                    let Some((index, item)) = next else {
                        break;
                    };
                    if failed.load(Ordering::Relaxed) {
                        continue;
                    }
                    match work(item).await {
                        Ok(value) => done.push((index, value)),
                        Err(e) => {
                            failed.store(true, Ordering::Relaxed);
                            return Err(e);
                        }
                    }
                }
                Ok(done)
            });
        }
        drop(queue_rx);

        for (index, item) in items.into_iter().enumerate() {
            // Fails only once every worker has exited.
            if queue_tx.send((index, item)).await.is_err() {
                break;
            }
        }
        drop(queue_tx);

        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(done)) => {
                    for (index, value) in done {
                        slots[index] = Some(value);
                    }
                }
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(CollectError::TaskFailed(format!("pool worker: {e}")));
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        debug!(items = total, workers = self.size, "work pool drained");
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_in_input_order() {
        let pool = WorkPool::new(3);
        let items: Vec<u64> = (0..20).collect();
        let results = pool
            .run(items, |i| async move {
                // Later items finish first.
                tokio::time::sleep(Duration::from_millis(20 - i)).await;
                Ok(i * 10)
            })
            .await
            .unwrap();
        assert_eq!(results, (0..20).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_size() {
        let pool = WorkPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (active.clone(), peak.clone());
        pool.run((0..10).collect::<Vec<u32>>(), move |_| {
            let (active, peak) = (a.clone(), p.clone());
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_fails_whole_run() {
        let pool = WorkPool::new(2);
        let result = pool
            .run((0..10).collect::<Vec<u32>>(), |i| async move {
                if i == 4 {
                    Err(CollectError::TaskFailed(format!("item {i}")))
                } else {
                    Ok(i)
                }
            })
            .await;
        assert!(matches!(result, Err(CollectError::TaskFailed(msg)) if msg == "item 4"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let pool = WorkPool::new(4);
        let results: Vec<u32> = pool.run(Vec::<u32>::new(), |i| async move { Ok(i) }).await.unwrap();
        assert!(results.is_empty());
    }
}
