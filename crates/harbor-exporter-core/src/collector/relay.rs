//! Fan-in relay from a group's producer into the shared output stream.
//!
//! ```text
//!  producer task ──► hand-off channel ──► forwarder task ──► out (shared)
//!                                               │
//!                                               └──► cache (if enabled)
//! ```
//!
//! The forwarder owns the group's cache guard while it runs and hands it back
//! through its join handle, which doubles as the completion barrier.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::error::CollectError;
use crate::metrics::Sample;

use super::SampleSink;
use super::cache::{CacheState, RefreshPermit};

/// Capacity of the producer → forwarder hand-off channel.
const HANDOFF_CAPACITY: usize = 256;

/// Sending half handed to a producer.
pub type SampleSender = mpsc::Sender<Sample>;

type Guard = Option<tokio::sync::OwnedMutexGuard<CacheState>>;

/// Completion barrier of one relay.
#[derive(Debug)]
pub struct RefreshHandle {
    forwarder: JoinHandle<(Guard, usize)>,
}

impl RefreshHandle {
    /// Waits until every sample sent so far has been forwarded, then commits
    /// (`ok`) or discards the refreshed cache and releases the group lock.
    ///
    /// All [`SampleSender`]s must be dropped before calling this.
    pub async fn finish(self, ok: bool) -> Result<(), CollectError> {
        let (guard, forwarded) = self
            .forwarder
            .await
            .map_err(|e| CollectError::TaskFailed(format!("relay forwarder: {e}")))?;
        trace!(forwarded, ok, "relay drained");
        if let Some(mut state) = guard {
            if ok {
                state.commit();
            } else {
                state.discard();
            }
        }
        Ok(())
    }
}

pub struct SampleRelay;

impl SampleRelay {
    /// Opens the hand-off channel and starts the forwarder.
    pub fn open(permit: RefreshPermit, out: SampleSink) -> (SampleSender, RefreshHandle) {
        let (tx, mut rx) = mpsc::channel::<Sample>(HANDOFF_CAPACITY);
        let mut guard = permit.guard;

        let forwarder = tokio::spawn(async move {
            let mut forwarded = 0usize;
            while let Some(sample) = rx.recv().await {
                if let Some(state) = guard.as_mut() {
                    state.push(sample.clone());
                }
                // A closed output only means nobody reads this scrape anymore;
                // the cache still gets the full refresh.
                let _ = out.send(sample);
                forwarded += 1;
            }
            (guard, forwarded)
        });

        (tx, RefreshHandle { forwarder })
    }

    /// Runs `producer` as its own task feeding the relay and waits for both
    /// the producer and the forwarder to finish.
    ///
    /// The cache is committed only if the producer returned `Ok`.
    pub async fn run<F, Fut>(
        permit: RefreshPermit,
        out: SampleSink,
        producer: F,
    ) -> Result<(), CollectError>
    where
        F: FnOnce(SampleSender) -> Fut,
        Fut: Future<Output = Result<(), CollectError>> + Send + 'static,
    {
        let (tx, handle) = Self::open(permit, out);
        let result = match tokio::spawn(producer(tx)).await {
            Ok(result) => result,
            Err(e) => Err(CollectError::TaskFailed(format!("producer: {e}"))),
        };
        handle.finish(result.is_ok()).await?;
        result
    }
}

/// Sends one sample into the relay.
pub async fn emit(tx: &SampleSender, sample: Sample) -> Result<(), CollectError> {
    tx.send(sample)
        .await
        .map_err(|_| CollectError::TaskFailed("relay closed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::cache::{Replay, ReplayCache};
    use crate::metrics::{MetricCatalog, MetricKey};
    use std::time::Duration;

    fn sample(catalog: &MetricCatalog, group: &str, i: usize) -> Sample {
        Sample::new(
            catalog.get(MetricKey::ComponentsHealth),
            i as f64,
            [format!("{group}-{i}")],
        )
    }

    #[tokio::test]
    async fn test_relay_forwards_in_order() {
        let catalog = MetricCatalog::new("");
        let expected: Vec<Sample> = (0..1000).map(|i| sample(&catalog, "a", i)).collect();
        let (out, mut rx) = mpsc::unbounded_channel();

        let items = expected.clone();
        SampleRelay::run(RefreshPermit { guard: None }, out, move |tx| async move {
            for s in items {
                emit(&tx, s).await?;
            }
            Ok(())
        })
        .await
        .unwrap();

        let mut received = Vec::new();
        while let Ok(s) = rx.try_recv() {
            received.push(s);
        }
        assert_eq!(received, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_relays_keep_per_group_order() {
        let catalog = std::sync::Arc::new(MetricCatalog::new(""));
        let (out, mut rx) = mpsc::unbounded_channel();

        let mut relays = Vec::new();
        for group in ["a", "b", "c"] {
            let out = out.clone();
            let catalog = catalog.clone();
            relays.push(tokio::spawn(async move {
                SampleRelay::run(RefreshPermit { guard: None }, out, move |tx| async move {
                    for i in 0..500 {
                        emit(&tx, sample(&catalog, group, i)).await?;
                        if i % 50 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                    Ok(())
                })
                .await
            }));
        }
        for relay in relays {
            relay.await.unwrap().unwrap();
        }
        drop(out);

        let mut per_group: std::collections::HashMap<String, Vec<f64>> = Default::default();
        while let Some(s) = rx.recv().await {
            let group = s.labels()[0].split('-').next().unwrap().to_string();
            per_group.entry(group).or_default().push(s.value());
        }
        assert_eq!(per_group.len(), 3);
        for values in per_group.values() {
            let expected: Vec<f64> = (0..500).map(|i| i as f64).collect();
            assert_eq!(values, &expected);
        }
    }

    #[tokio::test]
    async fn test_failed_producer_discards_cache() {
        let catalog = MetricCatalog::new("");
        let cache = ReplayCache::new(true, Duration::from_secs(60));
        let (out, mut rx) = mpsc::unbounded_channel();
        let Replay::Refresh(permit) = cache.try_replay(&out).await else {
            panic!("expected a refresh");
        };

        let s = sample(&catalog, "a", 0);
        let result = SampleRelay::run(permit, out.clone(), move |tx| async move {
            emit(&tx, s).await?;
            Err(CollectError::TaskFailed("boom".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert!(rx.try_recv().is_ok());

        assert!(!cache.try_replay(&out).await.is_replayed());
    }

    #[tokio::test]
    async fn test_panicking_producer_is_reported() {
        let (out, _rx) = mpsc::unbounded_channel();
        let result = SampleRelay::run(RefreshPermit { guard: None }, out, |_tx| async move {
            if true {
                panic!("producer blew up");
            }
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CollectError::TaskFailed(_))));
    }
}
