//! Collector configuration, read once at startup.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::ConfigError;
use crate::groups::MetricGroup;

/// Everything the collection pipeline needs to know about its environment.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Harbor base URL, e.g. `https://harbor.example.com`.
    pub server: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Page size for paginated listings. Must be positive.
    pub page_size: usize,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub enabled_groups: BTreeSet<MetricGroup>,
    /// Fixed worker count for per-project fan-out. Must be positive.
    pub workers: usize,
    /// Emit a `<group>_latency` sample after each successful refresh.
    pub latency_metrics: bool,
    /// Optional instance name inserted into every metric name.
    pub instance: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:8500".to_string(),
            username: "admin".to_string(),
            password: "password".to_string(),
            timeout: Duration::from_secs(10),
            insecure: false,
            page_size: 100,
            cache_enabled: false,
            cache_ttl: Duration::from_secs(20),
            enabled_groups: MetricGroup::ALL.iter().copied().collect(),
            workers: 4,
            latency_metrics: true,
            instance: String::new(),
        }
    }
}

impl CollectorConfig {
    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::PageSize);
        }
        if self.workers == 0 {
            return Err(ConfigError::Workers);
        }
        if !valid_instance(&self.instance) {
            return Err(ConfigError::Instance(self.instance.clone()));
        }
        Ok(())
    }

    /// Disables every group listed in `skip`.
    pub fn skip_groups(mut self, skip: &[MetricGroup]) -> Self {
        for group in skip {
            self.enabled_groups.remove(group);
        }
        self
    }
}

/// Empty, or `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn valid_instance(instance: &str) -> bool {
    let mut chars = instance.chars();
    match chars.next() {
        None => true,
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_' || first == ':')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
    }
}
