//! Project and repository counts from `/statistics`.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample};

use super::GroupContext;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Statistics {
    pub total_project_count: f64,
    pub public_project_count: f64,
    pub private_project_count: f64,
    pub public_repo_count: f64,
    pub total_repo_count: f64,
    pub private_repo_count: f64,
}

pub(crate) fn to_samples(stats: &Statistics, catalog: &MetricCatalog) -> Vec<Sample> {
    let projects = catalog.get(MetricKey::ProjectCountTotal);
    let repos = catalog.get(MetricKey::RepoCountTotal);
    vec![
        Sample::new(projects, stats.total_project_count, ["total_project"]),
        Sample::new(projects, stats.public_project_count, ["public_project"]),
        Sample::new(projects, stats.private_project_count, ["private_project"]),
        Sample::new(repos, stats.public_repo_count, ["public_repo"]),
        Sample::new(repos, stats.total_repo_count, ["total_repo"]),
        Sample::new(repos, stats.private_repo_count, ["private_repo"]),
    ]
}

pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    let stats: Statistics = ctx.client.get_json("/statistics").await?;
    Ok(to_samples(&stats, &ctx.catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_mapping() {
        let stats: Statistics = serde_json::from_str(
            r#"{"private_project_count":2,"private_repo_count":5,"public_project_count":1,
                "public_repo_count":3,"total_project_count":3,"total_repo_count":8,
                "total_storage_consumption":123}"#,
        )
        .unwrap();
        let samples = to_samples(&stats, &MetricCatalog::new(""));
        let observed: Vec<(&str, &str, f64)> = samples
            .iter()
            .map(|s| (s.name(), s.label("type").unwrap(), s.value()))
            .collect();
        assert_eq!(
            observed,
            vec![
                ("harbor_project_count_total", "total_project", 3.0),
                ("harbor_project_count_total", "public_project", 1.0),
                ("harbor_project_count_total", "private_project", 2.0),
                ("harbor_repo_count_total", "public_repo", 3.0),
                ("harbor_repo_count_total", "total_repo", 8.0),
                ("harbor_repo_count_total", "private_repo", 5.0),
            ]
        );
    }
}
