//! One collector per metric group: replay or refresh, then report.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::groups::{GroupContext, MetricGroup};
use crate::metrics::Sample;

use super::SampleSink;
use super::cache::{Replay, ReplayCache};
use super::relay::{SampleRelay, emit};

/// Outcome of one group in one scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupResult {
    pub group: MetricGroup,
    pub ok: bool,
}

/// Owns the cache of one [`MetricGroup`] and drives its refreshes.
pub struct GroupCollector {
    group: MetricGroup,
    cache: ReplayCache,
    ctx: Arc<GroupContext>,
    latency_metrics: bool,
}

impl GroupCollector {
    pub fn new(group: MetricGroup, ctx: Arc<GroupContext>, cache: ReplayCache) -> Self {
        Self {
            group,
            cache,
            ctx,
            latency_metrics: true,
        }
    }

    /// Enables or disables the trailing `<group>_latency` sample.
    pub fn with_latency_metrics(mut self, enabled: bool) -> Self {
        self.latency_metrics = enabled;
        self
    }

    pub fn group(&self) -> MetricGroup {
        self.group
    }

    /// Writes this group's samples to `out`, from cache or from Harbor.
    ///
    /// Fetch and decode errors are logged and reported as `ok == false`; the
    /// group then contributes no samples and its cache stays stale.
    pub async fn collect(&self, out: &SampleSink) -> GroupResult {
        let start = Instant::now();
        let permit = match self.cache.try_replay(out).await {
            Replay::Replayed => {
                debug!(group = %self.group, "replayed cached samples");
                return self.result(true);
            }
            Replay::Refresh(permit) => permit,
        };

        let group = self.group;
        let ctx = Arc::clone(&self.ctx);
        let latency_metrics = self.latency_metrics;
        let result = SampleRelay::run(permit, out.clone(), move |tx| async move {
            let samples = group.fetch_samples(&ctx).await?;
            let count = samples.len();
            for sample in samples {
                emit(&tx, sample).await?;
            }
            if latency_metrics {
                let desc = ctx.catalog.get(group.latency_key());
                emit(&tx, Sample::unlabeled(desc, start.elapsed().as_secs_f64())).await?;
            }
            debug!(group = %group, samples = count, "group refreshed");
            Ok(())
        })
        .await;

        match result {
            Ok(()) => self.result(true),
            Err(e) => {
                warn!(group = %self.group, error = %e, "group collection failed");
                self.result(false)
            }
        }
    }

    fn result(&self, ok: bool) -> GroupResult {
        GroupResult {
            group: self.group,
            ok,
        }
    }
}
