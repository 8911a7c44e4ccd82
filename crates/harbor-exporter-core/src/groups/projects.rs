//! Project and repository listings shared by the repositories and artifacts
//! groups.

use serde::Deserialize;

use crate::client::{ApiVersion, HarborClient};
use crate::error::CollectError;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Project {
    #[serde(default)]
    pub project_id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Repository {
    #[serde(default)]
    pub id: i64,
    /// Full name including the project, e.g. `library/nginx`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pull_count: f64,
    #[serde(default)]
    pub star_count: f64,
    /// `tags_count` on v1, `artifact_count` on v2.
    #[serde(default, alias = "artifact_count")]
    pub tags_count: f64,
}

pub(crate) async fn load_projects(client: &HarborClient) -> Result<Vec<Project>, CollectError> {
    client.pages().fetch_all("/projects").await
}

pub(crate) fn repositories_endpoint(api_version: ApiVersion, project: &Project) -> String {
    match api_version {
        ApiVersion::V2 => format!("/projects/{}/repositories", project.name),
        ApiVersion::V1 => format!("/repositories?project_id={}", project.project_id),
    }
}

pub(crate) async fn load_repositories(
    client: &HarborClient,
    project: &Project,
) -> Result<Vec<Repository>, CollectError> {
    let endpoint = repositories_endpoint(client.api_version(), project);
    client.pages().fetch_all(&endpoint).await
}
