//! Status and task counts of the latest execution of each enabled
//! replication policy.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample, bool_value};

use super::{GroupContext, id_label};

const IN_PROGRESS: &str = "InProgress";
const SUCCEED: &str = "Succeed";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Policy {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Execution {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub failed: f64,
    #[serde(default)]
    pub succeed: f64,
    #[serde(default)]
    pub in_progress: f64,
    #[serde(default)]
    pub stopped: f64,
}

/// The execution to report, given the history newest first. A running
/// execution gives way to the one before it, when there is one.
pub(crate) fn reported_execution(history: &[Execution]) -> Option<&Execution> {
    let latest = history.first()?;
    if latest.status == IN_PROGRESS {
        return Some(history.get(1).unwrap_or(latest));
    }
    Some(latest)
}

pub(crate) fn policy_samples(policy: &Policy, history: &[Execution], catalog: &MetricCatalog) -> Vec<Sample> {
    let Some(execution) = reported_execution(history) else {
        debug!(policy = %policy.name, "replication policy has no executions");
        return Vec::new();
    };
    let tasks = catalog.get(MetricKey::ReplicationTasks);
    let name = policy.name.as_str();
    vec![
        Sample::new(
            catalog.get(MetricKey::ReplicationStatus),
            bool_value(execution.status == SUCCEED),
            [name],
        ),
        Sample::new(tasks, execution.failed, [name, "failed"]),
        Sample::new(tasks, execution.succeed, [name, "succeed"]),
        Sample::new(tasks, execution.in_progress, [name, "in_progress"]),
        Sample::new(tasks, execution.stopped, [name, "stopped"]),
    ]
}

fn executions_endpoint(policy: &Policy) -> String {
    format!(
        "/replication/executions?policy_id={}&page=1&page_size=2",
        id_label(policy.id)
    )
}

pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    let policies: Vec<Policy> = ctx.client.pages().fetch_all("/replication/policies").await?;
    let enabled: Vec<Policy> = policies.into_iter().filter(|p| p.enabled).collect();

    let worker_ctx = Arc::clone(ctx);
    let histories = ctx
        .pool
        .run(enabled.clone(), move |policy| {
            let ctx = Arc::clone(&worker_ctx);
            async move {
                ctx.client
                    .get_json::<Vec<Execution>>(&executions_endpoint(&policy))
                    .await
            }
        })
        .await?;

    Ok(enabled
        .iter()
        .zip(&histories)
        .flat_map(|(policy, history)| policy_samples(policy, history, &ctx.catalog))
        .collect())
}
