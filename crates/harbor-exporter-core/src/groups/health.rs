//! Overall and per-component health from `/health`.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample};

use super::GroupContext;

#[derive(Debug, Deserialize)]
pub(crate) struct OverallHealth {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub components: Vec<ComponentHealth>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComponentHealth {
    pub name: String,
    #[serde(default)]
    pub status: String,
}

fn status_value(status: &str) -> f64 {
    if status == "healthy" { 1.0 } else { 0.0 }
}

pub(crate) fn to_samples(health: &OverallHealth, catalog: &MetricCatalog) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(1 + health.components.len());
    samples.push(Sample::unlabeled(
        catalog.get(MetricKey::Health),
        status_value(&health.status),
    ));
    let component = catalog.get(MetricKey::ComponentsHealth);
    for c in &health.components {
        samples.push(Sample::new(component, status_value(&c.status), [c.name.as_str()]));
    }
    samples
}

pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    let health: OverallHealth = ctx.client.get_json("/health").await?;
    Ok(to_samples(&health, &ctx.catalog))
}
