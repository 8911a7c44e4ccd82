//! Per-project quota limits and usage from the paged `/quotas` listing.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample};

use super::{GroupContext, id_label};

#[derive(Debug, Deserialize)]
pub(crate) struct Quota {
    #[serde(default, rename = "ref")]
    pub reference: Option<QuotaRef>,
    #[serde(default)]
    pub hard: Resources,
    #[serde(default)]
    pub used: Resources,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuotaRef {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Resources {
    pub count: f64,
    pub storage: f64,
}

/// Four samples per quota that references a named project; the rest are
/// skipped.
pub(crate) fn to_samples(quotas: &[Quota], catalog: &MetricCatalog) -> Vec<Sample> {
    let count = catalog.get(MetricKey::QuotasCountTotal);
    let size = catalog.get(MetricKey::QuotasSizeBytes);
    let mut samples = Vec::with_capacity(quotas.len() * 4);
    for quota in quotas {
        let Some(r) = quota.reference.as_ref().filter(|r| !r.name.is_empty() && r.id != 0) else {
            debug!(reference = ?quota.reference, "skipping quota without project reference");
            continue;
        };
        let id = id_label(r.id);
        let name = r.name.as_str();
        samples.push(Sample::new(count, quota.hard.count, ["hard", name, id.as_str()]));
        samples.push(Sample::new(count, quota.used.count, ["used", name, id.as_str()]));
        samples.push(Sample::new(size, quota.hard.storage, ["hard", name, id.as_str()]));
        samples.push(Sample::new(size, quota.used.storage, ["used", name, id.as_str()]));
    }
    samples
}

pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    let quotas: Vec<Quota> = ctx.client.pages().fetch_all("/quotas").await?;
    Ok(to_samples(&quotas, &ctx.catalog))
}
