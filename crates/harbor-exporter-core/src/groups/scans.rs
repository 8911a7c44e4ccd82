//! Progress of the latest "scan all" run from `/scans/all/metrics`.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample};

use super::GroupContext;

#[derive(Debug, Deserialize)]
pub(crate) struct ScanAllMetrics {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub completed: f64,
    /// Free-form string upstream; usually a numeric id.
    #[serde(default)]
    pub requester: String,
}

pub(crate) fn to_samples(metrics: &ScanAllMetrics, catalog: &MetricCatalog) -> Vec<Sample> {
    let requester = metrics.requester.trim().parse::<f64>().unwrap_or(0.0);
    vec![
        Sample::unlabeled(catalog.get(MetricKey::ScansRequester), requester),
        Sample::unlabeled(catalog.get(MetricKey::ScansTotal), metrics.total),
        Sample::unlabeled(catalog.get(MetricKey::ScansCompleted), metrics.completed),
    ]
}

pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    let metrics: ScanAllMetrics = ctx.client.get_json("/scans/all/metrics").await?;
    Ok(to_samples(&metrics, &ctx.catalog))
}
