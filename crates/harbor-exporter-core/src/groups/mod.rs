//! Metric groups: what each one fetches from Harbor and how the records map
//! to samples.
//!
//! Every group module has the same shape: serde types for the upstream JSON, a
//! pure mapping function from decoded records to [`Sample`]s and an async
//! `fetch` that drives the requests. A group either returns all of its samples
//! or an error; nothing is emitted for a partially fetched group.

mod artifacts;
mod health;
mod projects;
mod quotas;
mod replication;
mod repositories;
mod scans;
mod statistics;
mod systeminfo;
mod volumes;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::client::HarborClient;
use crate::collector::WorkPool;
use crate::config::CollectorConfig;
use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample};

/// Independent category of metrics with its own cache and liveness flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricGroup {
    Health,
    Scans,
    Statistics,
    Quotas,
    Repositories,
    Replication,
    SystemVolumes,
    SystemInfo,
    Artifacts,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 9] = [
        MetricGroup::Health,
        MetricGroup::Scans,
        MetricGroup::Statistics,
        MetricGroup::Quotas,
        MetricGroup::Repositories,
        MetricGroup::Replication,
        MetricGroup::SystemVolumes,
        MetricGroup::SystemInfo,
        MetricGroup::Artifacts,
    ];

    /// Name used on the command line and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricGroup::Health => "health",
            MetricGroup::Scans => "scans",
            MetricGroup::Statistics => "statistics",
            MetricGroup::Quotas => "quotas",
            MetricGroup::Repositories => "repositories",
            MetricGroup::Replication => "replication",
            MetricGroup::SystemVolumes => "systemvolumes",
            MetricGroup::SystemInfo => "systeminfo",
            MetricGroup::Artifacts => "artifacts",
        }
    }

    /// Descriptor of the `<group>_latency` sample.
    pub fn latency_key(self) -> MetricKey {
        match self {
            MetricGroup::Health => MetricKey::HealthLatency,
            MetricGroup::Scans => MetricKey::ScansLatency,
            MetricGroup::Statistics => MetricKey::StatisticsLatency,
            MetricGroup::Quotas => MetricKey::QuotasLatency,
            MetricGroup::Repositories => MetricKey::RepositoriesLatency,
            MetricGroup::Replication => MetricKey::ReplicationLatency,
            MetricGroup::SystemVolumes => MetricKey::SystemVolumesLatency,
            MetricGroup::SystemInfo => MetricKey::SystemInfoLatency,
            MetricGroup::Artifacts => MetricKey::ArtifactsLatency,
        }
    }

    /// Fetches and maps every record of this group.
    pub async fn fetch_samples(self, ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
        match self {
            MetricGroup::Health => health::fetch(ctx).await,
            MetricGroup::Scans => scans::fetch(ctx).await,
            MetricGroup::Statistics => statistics::fetch(ctx).await,
            MetricGroup::Quotas => quotas::fetch(ctx).await,
            MetricGroup::Repositories => repositories::fetch(ctx).await,
            MetricGroup::Replication => replication::fetch(ctx).await,
            MetricGroup::SystemVolumes => volumes::fetch(ctx).await,
            MetricGroup::SystemInfo => systeminfo::fetch(ctx).await,
            MetricGroup::Artifacts => artifacts::fetch(ctx).await,
        }
    }
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricGroup::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = MetricGroup::ALL.iter().map(|g| g.as_str()).collect();
                format!("unknown metric group '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Shared, read-only state every group fetch runs against.
#[derive(Debug)]
pub struct GroupContext {
    pub client: HarborClient,
    pub catalog: Arc<MetricCatalog>,
    pub pool: WorkPool,
}

impl GroupContext {
    pub fn new(client: HarborClient, config: &CollectorConfig) -> Self {
        Self {
            client,
            catalog: Arc::new(MetricCatalog::new(&config.instance)),
            pool: WorkPool::new(config.workers),
        }
    }
}

/// Harbor ids rendered as label values.
pub(crate) fn id_label(id: i64) -> String {
    id.to_string()
}
