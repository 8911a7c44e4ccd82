//! Prometheus text exposition of one scrape.
//!
//! Every scrape is rendered through a fresh `prometheus::Registry`, so the
//! output contains exactly the samples of that scrape plus the exporter's own
//! build info and, on Linux, process metrics.

use std::collections::HashMap;

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};

use harbor_exporter_core::metrics::{MetricDesc, MetricKind, Sample};

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

impl Family {
    fn register(desc: &MetricDesc, registry: &Registry) -> prometheus::Result<Self> {
        let opts = Opts::new(desc.name.clone(), desc.help);
        let family = match desc.kind {
            MetricKind::Gauge => {
                let vec = GaugeVec::new(opts, desc.label_names)?;
                registry.register(Box::new(vec.clone()))?;
                Family::Gauge(vec)
            }
            MetricKind::Counter => {
                let vec = CounterVec::new(opts, desc.label_names)?;
                registry.register(Box::new(vec.clone()))?;
                Family::Counter(vec)
            }
        };
        Ok(family)
    }

    fn observe(&self, sample: &Sample) -> prometheus::Result<()> {
        let labels: Vec<&str> = sample.labels().iter().map(String::as_str).collect();
        match self {
            Family::Gauge(vec) => vec.get_metric_with_label_values(&labels)?.set(sample.value()),
            Family::Counter(vec) => vec
                .get_metric_with_label_values(&labels)?
                .inc_by(sample.value().max(0.0)),
        }
        Ok(())
    }
}

/// `harbor_exporter_build_info{version,revision} 1`.
fn register_build_info(registry: &Registry) -> prometheus::Result<()> {
    let info = GaugeVec::new(
        Opts::new(
            "harbor_exporter_build_info",
            "A metric with a constant '1' value labeled by version and revision from which harbor_exporter was built.",
        ),
        &["version", "revision"],
    )?;
    info.get_metric_with_label_values(&[env!("CARGO_PKG_VERSION"), env!("GIT_SHA")])?
        .set(1.0);
    registry.register(Box::new(info))
}

#[cfg(target_os = "linux")]
fn register_process_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))
}

#[cfg(not(target_os = "linux"))]
fn register_process_metrics(_registry: &Registry) -> prometheus::Result<()> {
    Ok(())
}

/// Renders `samples` in the Prometheus text format.
pub(crate) fn encode(samples: &[Sample]) -> prometheus::Result<(Vec<u8>, String)> {
    let registry = Registry::new();
    register_build_info(&registry)?;
    register_process_metrics(&registry)?;
    let mut families: HashMap<&str, Family> = HashMap::new();
    for sample in samples {
        if !families.contains_key(sample.name()) {
            let family = Family::register(sample.desc(), &registry)?;
            families.insert(sample.name(), family);
        }
        families[sample.name()].observe(sample)?;
    }

    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder.encode(&registry.gather(), &mut buf)?;
    Ok((buf, encoder.format_type().to_string()))
}
