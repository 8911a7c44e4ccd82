//! Metric samples and their descriptors.
//!
//! A [`Sample`] is one observation ready for exposition: a shared
//! [`MetricDesc`], a value and the label values in descriptor order.
//! Descriptors come from a [`MetricCatalog`] built once at startup and handed
//! to every group collector.

mod catalog;

use std::sync::Arc;

pub use catalog::{MetricCatalog, MetricKey};

/// Prometheus value type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// Static description of one metric family.
#[derive(Debug, PartialEq)]
pub struct MetricDesc {
    pub key: MetricKey,
    /// Fully-qualified name, e.g. `harbor_quotas_count_total`.
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    pub label_names: &'static [&'static str],
}

/// One emitted metric observation.
///
/// Identity is the descriptor name plus the label values; two samples with the
/// same identity must not appear in one scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    desc: Arc<MetricDesc>,
    value: f64,
    labels: Vec<String>,
}

impl Sample {
    pub fn new<I, S>(desc: &Arc<MetricDesc>, value: f64, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        debug_assert_eq!(
            labels.len(),
            desc.label_names.len(),
            "label count mismatch for {}",
            desc.name
        );
        Self {
            desc: Arc::clone(desc),
            value,
            labels,
        }
    }

    /// Sample of a metric without variable labels.
    pub fn unlabeled(desc: &Arc<MetricDesc>, value: f64) -> Self {
        Self::new(desc, value, std::iter::empty::<String>())
    }

    pub fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    pub fn key(&self) -> MetricKey {
        self.desc.key
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the value of the label called `name`, if the metric has one.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }
}

/// 1.0 for true, 0.0 for false.
pub fn bool_value(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}
