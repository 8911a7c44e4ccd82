//! Registry storage capacity from `/systeminfo/volumes`.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample};

use super::GroupContext;

#[derive(Debug, Deserialize)]
pub(crate) struct SystemVolumes {
    #[serde(default)]
    pub storage: Storage,
}

/// v1 reports one volume, v2 a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Storage {
    Single(Volume),
    Many(Vec<Volume>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Volume {
    pub total: f64,
    pub free: f64,
}

impl Default for Storage {
    fn default() -> Self {
        Storage::Single(Volume::default())
    }
}

impl Storage {
    fn totals(&self) -> (f64, f64) {
        match self {
            Storage::Single(v) => (v.total, v.free),
            Storage::Many(vs) => vs
                .iter()
                .fold((0.0, 0.0), |(total, free), v| (total + v.total, free + v.free)),
        }
    }
}

pub(crate) fn to_samples(volumes: &SystemVolumes, catalog: &MetricCatalog) -> Vec<Sample> {
    let (total, free) = volumes.storage.totals();
    let desc = catalog.get(MetricKey::SystemVolumesBytes);
    vec![
        Sample::new(desc, total, ["total"]),
        Sample::new(desc, free, ["free"]),
    ]
}

pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    let volumes: SystemVolumes = ctx.client.get_json("/systeminfo/volumes").await?;
    Ok(to_samples(&volumes, &ctx.catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(json: &str) -> Vec<f64> {
        let volumes: SystemVolumes = serde_json::from_str(json).unwrap();
        to_samples(&volumes, &MetricCatalog::new(""))
            .iter()
            .map(Sample::value)
            .collect()
    }

    #[test]
    fn test_single_volume() {
        assert_eq!(values(r#"{"storage":{"total":100,"free":40}}"#), vec![100.0, 40.0]);
    }

    #[test]
    fn test_volume_list_is_summed() {
        assert_eq!(
            values(r#"{"storage":[{"total":100,"free":40},{"total":50,"free":5}]}"#),
            vec![150.0, 45.0]
        );
    }

    #[test]
    fn test_missing_storage_reports_zero() {
        assert_eq!(values("{}"), vec![0.0, 0.0]);
        assert_eq!(values(r#"{"storage":{}}"#), vec![0.0, 0.0]);
    }

    #[test]
    fn test_malformed_storage_is_decode_error() {
        assert!(serde_json::from_str::<SystemVolumes>(r#"{"storage":"full"}"#).is_err());
    }
}
