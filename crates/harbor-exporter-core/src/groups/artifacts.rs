//! Size and vulnerability scan results of every artifact (v2 only).
//!
//! Walks projects, their repositories and each repository's artifacts. The
//! walk for each project runs on the worker pool; repositories within one
//! project are fetched one after another.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::client::{ApiVersion, HarborClient};
use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample};

use super::projects::{Project, Repository, load_projects, load_repositories};
use super::{GroupContext, id_label};

const ARTIFACT_QUERY: &str = "with_tag=true&with_scan_overview=true";

#[derive(Debug, Deserialize)]
pub(crate) struct Artifact {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub tags: Option<Vec<Tag>>,
    /// Keyed by report MIME type; only the first report is used.
    #[serde(default)]
    pub scan_overview: Option<BTreeMap<String, ScanOverview>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Tag {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ScanOverview {
    pub report_id: String,
    pub scan_status: String,
    pub duration: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub summary: Option<VulnerabilitySummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct VulnerabilitySummary {
    pub total: f64,
    pub fixable: f64,
    /// Counts per severity, e.g. `{"High": 2, "Low": 7}`.
    pub summary: Option<BTreeMap<String, f64>>,
}

impl Artifact {
    fn first_tag(&self) -> &str {
        self.tags
            .as_deref()
            .and_then(|tags| tags.first())
            .map_or("", |t| t.name.as_str())
    }

    fn scan(&self) -> Option<&ScanOverview> {
        self.scan_overview
            .as_ref()
            .and_then(|reports| reports.values().next())
            .filter(|s| !s.report_id.is_empty())
    }
}

impl VulnerabilitySummary {
    fn severity(&self, name: &str) -> f64 {
        self.summary
            .as_ref()
            .and_then(|s| s.get(name))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Everything fetched for one project.
#[derive(Debug)]
pub(crate) struct ProjectArtifacts {
    pub project: Project,
    pub repositories: Vec<(Repository, Vec<Artifact>)>,
}

/// Path segment for a repository: the project prefix removed and any `/`
/// double-encoded, as Harbor expects.
pub(crate) fn encoded_repository_name(project: &str, repository: &str) -> String {
    let short = repository
        .strip_prefix(project)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(repository);
    short.replace('/', "%252F")
}

fn scan_status_value(status: &str) -> f64 {
    match status.to_ascii_lowercase().as_str() {
        "success" => 1.0,
        "running" => 2.0,
        _ => 0.0,
    }
}

pub(crate) fn to_samples(projects: &[ProjectArtifacts], catalog: &MetricCatalog) -> Vec<Sample> {
    let size = catalog.get(MetricKey::ArtifactsSize);
    let vulnerabilities = catalog.get(MetricKey::ArtifactsVulnerabilities);
    let scan_duration = catalog.get(MetricKey::ArtifactsVulnerabilitiesScanDuration);
    let scan_start = catalog.get(MetricKey::ArtifactsVulnerabilitiesScanStart);
    let scans = catalog.get(MetricKey::ArtifactsVulnerabilitiesScans);

    let mut samples = Vec::new();
    for p in projects {
        let project_id = id_label(p.project.project_id);
        for (repo, artifacts) in &p.repositories {
            let repo_id = id_label(repo.id);
            for artifact in artifacts {
                let artifact_id = id_label(artifact.id);
                let tag = artifact.first_tag();
                let base = [
                    p.project.name.as_str(),
                    project_id.as_str(),
                    repo.name.as_str(),
                    repo_id.as_str(),
                    artifact.digest.as_str(),
                    artifact_id.as_str(),
                ];
                let with = |extra: &[&str]| -> Vec<String> {
                    let mut labels: Vec<String> = base.iter().map(|s| s.to_string()).collect();
                    labels.extend(extra.iter().map(|s| s.to_string()));
                    labels
                };

                samples.push(Sample::new(size, artifact.size, with(&[tag])));

                let Some(scan) = artifact.scan() else {
                    continue;
                };
                let report = scan.report_id.as_str();
                let summary = scan.summary.as_ref();
                let counts = [
                    ("fixable", summary.map_or(0.0, |s| s.fixable)),
                    ("total", summary.map_or(0.0, |s| s.total)),
                    ("low", summary.map_or(0.0, |s| s.severity("Low"))),
                    ("medium", summary.map_or(0.0, |s| s.severity("Medium"))),
                    ("high", summary.map_or(0.0, |s| s.severity("High"))),
                ];
                for (status, value) in counts {
                    samples.push(Sample::new(vulnerabilities, value, with(&[report, status, tag])));
                }
                samples.push(Sample::new(scan_duration, scan.duration, with(&[report, tag])));
                let started = scan.start_time.map_or(0.0, |t| t.timestamp() as f64);
                samples.push(Sample::new(scan_start, started, with(&[report, tag])));
                samples.push(Sample::new(scans, scan_status_value(&scan.scan_status), with(&[tag])));
            }
        }
    }
    samples
}

async fn load_project(client: &HarborClient, project: Project) -> Result<ProjectArtifacts, CollectError> {
    let repos = load_repositories(client, &project).await?;
    let mut repositories = Vec::with_capacity(repos.len());
    for repo in repos {
        let endpoint = format!(
            "/projects/{}/repositories/{}/artifacts?{ARTIFACT_QUERY}",
            project.name,
            encoded_repository_name(&project.name, &repo.name)
        );
        let artifacts: Vec<Artifact> = client.pages().fetch_all(&endpoint).await?;
        repositories.push((repo, artifacts));
    }
    debug!(project = %project.name, repositories = repositories.len(), "loaded artifacts");
    Ok(ProjectArtifacts {
        project,
        repositories,
    })
}

pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    if ctx.client.api_version() == ApiVersion::V1 {
        debug!("artifacts are not collected on the v1 API");
        return Ok(Vec::new());
    }

    let projects = load_projects(&ctx.client).await?;
    let worker_ctx = Arc::clone(ctx);
    let loaded = ctx
        .pool
        .run(projects, move |project| {
            let ctx = Arc::clone(&worker_ctx);
            async move { load_project(&ctx.client, project).await }
        })
        .await?;
    Ok(to_samples(&loaded, &ctx.catalog))
}
