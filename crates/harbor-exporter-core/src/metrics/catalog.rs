//! Catalog of every metric the exporter publishes.

use std::collections::HashMap;
use std::sync::Arc;

use super::{MetricDesc, MetricKind};

const NAMESPACE: &str = "harbor";

const NO_LABELS: &[&str] = &[];
const COMPONENT_LABELS: &[&str] = &["component"];
const TYPE_LABELS: &[&str] = &["type"];
const QUOTA_LABELS: &[&str] = &["type", "repo_name", "repo_id"];
const REPO_LABELS: &[&str] = &["repo_name", "repo_id"];
const STORAGE_LABELS: &[&str] = &["storage"];
const REPLICATION_LABELS: &[&str] = &["repl_pol_name"];
const REPLICATION_TASK_LABELS: &[&str] = &["repl_pol_name", "result"];
const SYSTEM_INFO_LABELS: &[&str] = &[
    "auth_mode",
    "project_creation_restriction",
    "harbor_version",
    "registry_storage_provider_name",
];
const ARTIFACT_LABELS: &[&str] = &[
    "project_name",
    "project_id",
    "repo_name",
    "repo_id",
    "artifact_name",
    "artifact_id",
    "tag",
];
const ARTIFACT_VULNERABILITY_LABELS: &[&str] = &[
    "project_name",
    "project_id",
    "repo_name",
    "repo_id",
    "artifact_name",
    "artifact_id",
    "report_id",
    "status",
    "tag",
];
const ARTIFACT_SCAN_LABELS: &[&str] = &[
    "project_name",
    "project_id",
    "repo_name",
    "repo_id",
    "artifact_name",
    "artifact_id",
    "report_id",
    "tag",
];

/// Logical key of a published metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKey {
    Up,
    Health,
    ComponentsHealth,
    HealthLatency,
    ScansTotal,
    ScansCompleted,
    ScansRequester,
    ScansLatency,
    ProjectCountTotal,
    RepoCountTotal,
    StatisticsLatency,
    QuotasCountTotal,
    QuotasSizeBytes,
    QuotasLatency,
    SystemVolumesBytes,
    SystemVolumesLatency,
    RepositoriesPullTotal,
    RepositoriesStarTotal,
    RepositoriesTagsTotal,
    RepositoriesLatency,
    ArtifactsSize,
    ArtifactsVulnerabilities,
    ArtifactsVulnerabilitiesScanStart,
    ArtifactsVulnerabilitiesScanDuration,
    ArtifactsVulnerabilitiesScans,
    ArtifactsLatency,
    ReplicationStatus,
    ReplicationTasks,
    ReplicationLatency,
    SystemInfo,
    SystemWithNotary,
    SystemSelfRegistration,
    SystemHasCaRoot,
    SystemReadOnly,
    SystemWithChartmuseum,
    SystemNotificationEnable,
    SystemInfoLatency,
}

struct Entry {
    key: MetricKey,
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    labels: &'static [&'static str],
}

const fn gauge(
    key: MetricKey,
    name: &'static str,
    help: &'static str,
    labels: &'static [&'static str],
) -> Entry {
    Entry {
        key,
        name,
        help,
        kind: MetricKind::Gauge,
        labels,
    }
}

#[rustfmt::skip]
const ENTRIES: &[Entry] = &[
    gauge(MetricKey::Up, "up", "Was the last query of harbor successful.", NO_LABELS),
    gauge(MetricKey::Health, "health", "Harbor overall health status: Healthy = 1, Unhealthy = 0", NO_LABELS),
    gauge(MetricKey::ComponentsHealth, "components_health", "Harbor components health status: Healthy = 1, Unhealthy = 0", COMPONENT_LABELS),
    gauge(MetricKey::HealthLatency, "health_latency", "Time in seconds to collect health metrics", NO_LABELS),
    gauge(MetricKey::ScansTotal, "scans_total", "metrics of the latest scan all process", NO_LABELS),
    gauge(MetricKey::ScansCompleted, "scans_completed", "metrics of the latest scan all process", NO_LABELS),
    gauge(MetricKey::ScansRequester, "scans_requester", "metrics of the latest scan all process", NO_LABELS),
    gauge(MetricKey::ScansLatency, "scans_latency", "Time in seconds to collect scan metrics", NO_LABELS),
    gauge(MetricKey::ProjectCountTotal, "project_count_total", "projects number relevant to the user", TYPE_LABELS),
    gauge(MetricKey::RepoCountTotal, "repo_count_total", "repositories number relevant to the user", TYPE_LABELS),
    gauge(MetricKey::StatisticsLatency, "statistics_latency", "Time in seconds to collect statistics metrics", NO_LABELS),
    gauge(MetricKey::QuotasCountTotal, "quotas_count_total", "quotas", QUOTA_LABELS),
    gauge(MetricKey::QuotasSizeBytes, "quotas_size_bytes", "quotas", QUOTA_LABELS),
    gauge(MetricKey::QuotasLatency, "quotas_latency", "Time in seconds to collect quota metrics", NO_LABELS),
    gauge(MetricKey::SystemVolumesBytes, "system_volumes_bytes", "Get system volume info (total/free size).", STORAGE_LABELS),
    gauge(MetricKey::SystemVolumesLatency, "system_volumes_latency", "Time in seconds to collect system_volume metrics", NO_LABELS),
    gauge(MetricKey::RepositoriesPullTotal, "repositories_pull_total", "Number of pulls per repository.", REPO_LABELS),
    gauge(MetricKey::RepositoriesStarTotal, "repositories_star_total", "Number of stars per repository.", REPO_LABELS),
    gauge(MetricKey::RepositoriesTagsTotal, "repositories_tags_total", "Number of tags (artifacts on v2) per repository.", REPO_LABELS),
    gauge(MetricKey::RepositoriesLatency, "repositories_latency", "Time in seconds to collect repository metrics", NO_LABELS),
    gauge(MetricKey::ArtifactsSize, "artifacts_size", "Size in bytes for uploaded artifacts", ARTIFACT_LABELS),
    gauge(MetricKey::ArtifactsVulnerabilities, "artifacts_vulnerabilities", "Detected vulnerabilities for uploaded artifacts", ARTIFACT_VULNERABILITY_LABELS),
    gauge(MetricKey::ArtifactsVulnerabilitiesScanStart, "artifacts_vulnerabilities_scan_start", "Vulnerabilities scan start time", ARTIFACT_SCAN_LABELS),
    gauge(MetricKey::ArtifactsVulnerabilitiesScanDuration, "artifacts_vulnerabilities_scan_duration", "Vulnerabilities scan duration", ARTIFACT_SCAN_LABELS),
    Entry {
        key: MetricKey::ArtifactsVulnerabilitiesScans,
        name: "artifacts_vulnerabilities_scans",
        help: "Vulnerabilities scan operation status. Success == 1, running == 2; others == 0",
        kind: MetricKind::Counter,
        labels: ARTIFACT_LABELS,
    },
    gauge(MetricKey::ArtifactsLatency, "artifacts_latency", "Time in seconds to collect artifacts metrics", NO_LABELS),
    gauge(MetricKey::ReplicationStatus, "replication_status", "Get status of the last execution of this replication policy: Succeed = 1, any other status = 0.", REPLICATION_LABELS),
    gauge(MetricKey::ReplicationTasks, "replication_tasks", "Get number of replication tasks, with various results, in the latest execution of this replication policy.", REPLICATION_TASK_LABELS),
    gauge(MetricKey::ReplicationLatency, "replication_latency", "Time in seconds to collect replication metrics", NO_LABELS),
    gauge(MetricKey::SystemInfo, "system_info", "A metric with a constant '1' value labeled by auth_mode, project_creation_restriction, harbor_version and registry_storage_provider_name from /systeminfo endpoint.", SYSTEM_INFO_LABELS),
    gauge(MetricKey::SystemWithNotary, "system_with_notary", "If notary is used", NO_LABELS),
    gauge(MetricKey::SystemSelfRegistration, "system_self_registration", "If self registration is enabled", NO_LABELS),
    gauge(MetricKey::SystemHasCaRoot, "system_has_ca_root", "If harbor has a root ca", NO_LABELS),
    gauge(MetricKey::SystemReadOnly, "system_read_only", "If harbor is in read-only mode", NO_LABELS),
    gauge(MetricKey::SystemWithChartmuseum, "system_with_chartmuseum", "If harbor has chartmuseum enabled", NO_LABELS),
    gauge(MetricKey::SystemNotificationEnable, "system_notification_enable", "If notifications are enabled", NO_LABELS),
    gauge(MetricKey::SystemInfoLatency, "system_info_latency", "Time in seconds to collect system info metrics", NO_LABELS),
];

/// Descriptor lookup for every [`MetricKey`], owned by the wiring code and
/// shared with each group collector.
#[derive(Debug)]
pub struct MetricCatalog {
    descs: HashMap<MetricKey, Arc<MetricDesc>>,
}

impl MetricCatalog {
    /// Builds the catalog. A non-empty `instance` becomes the middle part of
    /// every metric name: `harbor_<instance>_<metric>`.
    pub fn new(instance: &str) -> Self {
        let descs = ENTRIES
            .iter()
            .map(|e| {
                let desc = MetricDesc {
                    key: e.key,
                    name: build_fq_name(NAMESPACE, instance, e.name),
                    help: e.help,
                    kind: e.kind,
                    label_names: e.labels,
                };
                (e.key, Arc::new(desc))
            })
            .collect();
        Self { descs }
    }

    pub fn get(&self, key: MetricKey) -> &Arc<MetricDesc> {
        &self.descs[&key]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MetricDesc>> {
        self.descs.values()
    }
}

fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}
