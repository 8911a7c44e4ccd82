//! Runs every enabled group for one scrape and computes liveness.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::client::HarborClient;
use crate::config::CollectorConfig;
use crate::groups::{GroupContext, MetricGroup};
use crate::metrics::{MetricCatalog, MetricDesc, MetricKey, Sample, bool_value};

use super::cache::ReplayCache;
use super::group::{GroupCollector, GroupResult};

/// Result of one scrape.
#[derive(Debug)]
pub struct Scrape {
    /// Every group's samples followed by the liveness sample.
    pub samples: Vec<Sample>,
    /// True iff every scraped group succeeded.
    pub up: bool,
    /// Per-group outcomes, in group order.
    pub results: Vec<GroupResult>,
}

pub struct CollectionOrchestrator {
    collectors: Vec<Arc<GroupCollector>>,
    up: Arc<MetricDesc>,
}

impl CollectionOrchestrator {
    /// One collector with its own cache for each enabled group.
    pub fn new(config: &CollectorConfig, client: HarborClient) -> Self {
        let ctx = Arc::new(GroupContext::new(client, config));
        let up = Arc::clone(ctx.catalog.get(MetricKey::Up));
        let collectors = config
            .enabled_groups
            .iter()
            .map(|&group| {
                let cache = ReplayCache::new(config.cache_enabled, config.cache_ttl);
                let collector = GroupCollector::new(group, Arc::clone(&ctx), cache)
                    .with_latency_metrics(config.latency_metrics);
                Arc::new(collector)
            })
            .collect();
        Self { collectors, up }
    }

    pub fn from_collectors(collectors: Vec<GroupCollector>, catalog: &MetricCatalog) -> Self {
        Self {
            collectors: collectors.into_iter().map(Arc::new).collect(),
            up: Arc::clone(catalog.get(MetricKey::Up)),
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = MetricGroup> + '_ {
        self.collectors.iter().map(|c| c.group())
    }

    /// Scrapes every configured group.
    pub async fn scrape(&self) -> Scrape {
        let all: BTreeSet<MetricGroup> = self.groups().collect();
        self.scrape_groups(&all).await
    }

    /// Scrapes the configured groups that are also in `enabled`, concurrently,
    /// into one shared stream. Returns once every group has finished.
    pub async fn scrape_groups(&self, enabled: &BTreeSet<MetricGroup>) -> Scrape {
        let (out, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        for collector in self.collectors.iter().filter(|c| enabled.contains(&c.group())) {
            let collector = Arc::clone(collector);
            let out = out.clone();
            tasks.spawn(async move { collector.collect(&out).await });
        }
        drop(out);

        let mut results = Vec::with_capacity(tasks.len());
        let mut panicked = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(error = %e, "group collector task failed");
                    panicked = true;
                }
            }
        }
        results.sort_by_key(|r| r.group);

        let mut samples = Vec::new();
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
        }

        let up = !panicked && liveness(&results);
        samples.push(Sample::unlabeled(&self.up, bool_value(up)));

        if up {
            debug!(groups = results.len(), samples = samples.len(), "scrape completed");
        } else {
            let failed: Vec<String> = results
                .iter()
                .filter(|r| !r.ok)
                .map(|r| r.group.to_string())
                .collect();
            info!(failed = ?failed, samples = samples.len(), "scrape completed with failures");
        }

        Scrape {
            samples,
            up,
            results,
        }
    }
}

/// Logical AND over every group's outcome.
pub fn liveness(results: &[GroupResult]) -> bool {
    results.iter().all(|r| r.ok)
}
