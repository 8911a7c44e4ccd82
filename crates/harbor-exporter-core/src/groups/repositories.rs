//! Pull, star and tag counts for every repository of every project.

use std::sync::Arc;

use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample};

use super::projects::{Repository, load_projects, load_repositories};
use super::{GroupContext, id_label};

pub(crate) fn to_samples<'a, I>(repositories: I, catalog: &MetricCatalog) -> Vec<Sample>
where
    I: IntoIterator<Item = &'a Repository>,
{
    let pull = catalog.get(MetricKey::RepositoriesPullTotal);
    let star = catalog.get(MetricKey::RepositoriesStarTotal);
    let tags = catalog.get(MetricKey::RepositoriesTagsTotal);
    let mut samples = Vec::new();
    for repo in repositories {
        let id = id_label(repo.id);
        let labels = [repo.name.as_str(), id.as_str()];
        samples.push(Sample::new(pull, repo.pull_count, labels));
        samples.push(Sample::new(star, repo.star_count, labels));
        samples.push(Sample::new(tags, repo.tags_count, labels));
    }
    samples
}

/// Lists projects, then each project's repositories on the worker pool.
pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    let projects = load_projects(&ctx.client).await?;
    let worker_ctx = Arc::clone(ctx);
    let per_project = ctx
        .pool
        .run(projects, move |project| {
            let ctx = Arc::clone(&worker_ctx);
            async move { load_repositories(&ctx.client, &project).await }
        })
        .await?;
    Ok(to_samples(per_project.iter().flatten(), &ctx.catalog))
}
