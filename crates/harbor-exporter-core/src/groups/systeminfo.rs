//! Version and feature flags from `/systeminfo`.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::CollectError;
use crate::metrics::{MetricCatalog, MetricKey, Sample, bool_value};

use super::GroupContext;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SystemInfo {
    pub with_notary: bool,
    pub auth_mode: String,
    pub project_creation_restriction: String,
    pub self_registration: bool,
    pub has_ca_root: bool,
    pub harbor_version: String,
    pub registry_storage_provider_name: String,
    pub read_only: bool,
    pub with_chartmuseum: bool,
    pub notification_enable: bool,
}

pub(crate) fn to_samples(info: &SystemInfo, catalog: &MetricCatalog) -> Vec<Sample> {
    let flag = |key: MetricKey, value: bool| Sample::unlabeled(catalog.get(key), bool_value(value));
    vec![
        Sample::new(
            catalog.get(MetricKey::SystemInfo),
            1.0,
            [
                info.auth_mode.as_str(),
                info.project_creation_restriction.as_str(),
                info.harbor_version.as_str(),
                info.registry_storage_provider_name.as_str(),
            ],
        ),
        flag(MetricKey::SystemWithNotary, info.with_notary),
        flag(MetricKey::SystemSelfRegistration, info.self_registration),
        flag(MetricKey::SystemHasCaRoot, info.has_ca_root),
        flag(MetricKey::SystemReadOnly, info.read_only),
        flag(MetricKey::SystemWithChartmuseum, info.with_chartmuseum),
        flag(MetricKey::SystemNotificationEnable, info.notification_enable),
    ]
}

pub(super) async fn fetch(ctx: &Arc<GroupContext>) -> Result<Vec<Sample>, CollectError> {
    let info: SystemInfo = ctx.client.get_json("/systeminfo").await?;
    Ok(to_samples(&info, &ctx.catalog))
}
