//! Per-group replay cache.
//!
//! A fresh cache answers a scrape by replaying the samples of the last
//! successful refresh. A stale cache hands out a [`RefreshPermit`] that keeps
//! the group's lock held until the refresh finishes, so a concurrent scrape of
//! the same group waits and then replays instead of hitting Harbor again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::metrics::Sample;

use super::SampleSink;

/// Cached samples and the time of the last successful refresh.
#[derive(Debug, Default)]
pub(crate) struct CacheState {
    last_refresh: Option<Instant>,
    samples: Vec<Sample>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        self.last_refresh.is_some_and(|last| now < last + ttl)
    }

    pub(crate) fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Marks a successful refresh.
    pub(crate) fn commit(&mut self) {
        self.last_refresh = Some(Instant::now());
    }

    /// Drops whatever a failed refresh left behind. `last_refresh` is kept so
    /// the cache stays stale.
    pub(crate) fn discard(&mut self) {
        self.samples.clear();
    }
}

/// Outcome of [`ReplayCache::try_replay`].
#[derive(Debug)]
pub enum Replay {
    /// Cached samples were written to the sink; nothing to fetch.
    Replayed,
    /// The caller must fetch. The permit holds the group lock, if caching is on.
    Refresh(RefreshPermit),
}

impl Replay {
    pub fn is_replayed(&self) -> bool {
        matches!(self, Replay::Replayed)
    }
}

/// Exclusive right to refresh one group's cache.
///
/// Dropping the permit without refreshing releases the lock and leaves the
/// cache empty and stale.
#[derive(Debug)]
pub struct RefreshPermit {
    pub(crate) guard: Option<OwnedMutexGuard<CacheState>>,
}

/// TTL cache of the samples one group emitted on its last refresh.
#[derive(Debug, Clone)]
pub struct ReplayCache {
    enabled: bool,
    ttl: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl ReplayCache {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            enabled,
            ttl,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// A cache that never replays.
    pub fn disabled() -> Self {
        Self::new(false, Duration::ZERO)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Replays cached samples into `out` if they are younger than the TTL.
    ///
    /// Otherwise clears the cached samples (keeping their allocation) and
    /// returns a permit that holds the lock until the refresh completes.
    pub async fn try_replay(&self, out: &SampleSink) -> Replay {
        if !self.enabled {
            return Replay::Refresh(RefreshPermit { guard: None });
        }

        let mut state = Arc::clone(&self.state).lock_owned().await;
        if state.is_fresh(self.ttl, Instant::now()) {
            for sample in &state.samples {
                if out.send(sample.clone()).is_err() {
                    break;
                }
            }
            return Replay::Replayed;
        }

        state.samples.clear();
        Replay::Refresh(RefreshPermit { guard: Some(state) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::relay::SampleRelay;
    use crate::metrics::{MetricCatalog, MetricKey};
    use tokio::sync::mpsc;

    fn samples(n: usize) -> Vec<Sample> {
        let catalog = MetricCatalog::new("");
        let desc = catalog.get(MetricKey::ComponentsHealth);
        (0..n)
            .map(|i| Sample::new(desc, i as f64, [format!("component-{i}")]))
            .collect()
    }

    async fn refresh(cache: &ReplayCache, items: Vec<Sample>, ok: bool) -> Vec<Sample> {
        let (out, mut rx) = mpsc::unbounded_channel();
        let Replay::Refresh(permit) = cache.try_replay(&out).await else {
            panic!("expected a refresh");
        };
        let (tx, handle) = SampleRelay::open(permit, out);
        for s in items {
            tx.send(s).await.unwrap();
        }
        drop(tx);
        handle.finish(ok).await.unwrap();
        let mut forwarded = Vec::new();
        while let Ok(s) = rx.try_recv() {
            forwarded.push(s);
        }
        forwarded
    }

    async fn replay(cache: &ReplayCache) -> Option<Vec<Sample>> {
        let (out, mut rx) = mpsc::unbounded_channel();
        match cache.try_replay(&out).await {
            Replay::Replayed => {
                drop(out);
                let mut replayed = Vec::new();
                while let Some(s) = rx.recv().await {
                    replayed.push(s);
                }
                Some(replayed)
            }
            Replay::Refresh(_) => None,
        }
    }

    #[tokio::test]
    async fn test_disabled_cache_never_replays() {
        let cache = ReplayCache::disabled();
        let forwarded = refresh(&cache, samples(3), true).await;
        assert_eq!(forwarded.len(), 3);
        assert!(replay(&cache).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_within_ttl() {
        let cache = ReplayCache::new(true, Duration::from_secs(20));
        let expected = samples(5);
        refresh(&cache, expected.clone(), true).await;

        tokio::time::advance(Duration::from_secs(19)).await;
        assert_eq!(replay(&cache).await, Some(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_after_ttl() {
        let cache = ReplayCache::new(true, Duration::from_secs(20));
        refresh(&cache, samples(5), true).await;

        tokio::time::advance(Duration::from_secs(20) + Duration::from_millis(1)).await;
        assert!(replay(&cache).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_is_not_replayed() {
        let cache = ReplayCache::new(true, Duration::from_secs(20));
        let forwarded = refresh(&cache, samples(2), false).await;
        assert_eq!(forwarded.len(), 2);

        assert!(replay(&cache).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_after_success_stays_stale() {
        let cache = ReplayCache::new(true, Duration::from_secs(20));
        refresh(&cache, samples(4), true).await;
        tokio::time::advance(Duration::from_secs(21)).await;

        refresh(&cache, samples(1), false).await;
        assert!(replay(&cache).await.is_none());

        let state = cache.state.lock().await;
        assert!(state.samples.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_replaces_samples() {
        let cache = ReplayCache::new(true, Duration::from_secs(20));
        refresh(&cache, samples(5), true).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let second = samples(2);
        refresh(&cache, second.clone(), true).await;
        assert_eq!(replay(&cache).await, Some(second));
    }

    #[tokio::test]
    async fn test_permit_holds_lock_until_finished() {
        let cache = ReplayCache::new(true, Duration::from_secs(60));
        let (out, _rx) = mpsc::unbounded_channel();
        let Replay::Refresh(permit) = cache.try_replay(&out).await else {
            panic!("expected a refresh");
        };

        assert!(cache.state.try_lock().is_err());
        drop(permit);
        assert!(cache.state.try_lock().is_ok());
    }
}
