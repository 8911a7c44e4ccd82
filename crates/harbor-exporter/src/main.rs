//! harbor-exporter - Prometheus exporter for the Harbor container registry.
//!
//! Every scrape of the telemetry path polls Harbor's REST API for the enabled
//! metric groups and renders the result in the Prometheus text format.

mod access_log;
mod exposition;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::process;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use harbor_exporter_core::client::HarborClient;
use harbor_exporter_core::collector::CollectionOrchestrator;
use harbor_exporter_core::config::CollectorConfig;
use harbor_exporter_core::groups::MetricGroup;

use state::{AppInner, SharedState};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_SHA"), ")");

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(name = "harbor-exporter", about = "Prometheus exporter for Harbor", version = VERSION)]
struct Args {
    /// Address to listen on for web interface and telemetry.
    #[arg(long, default_value = "0.0.0.0:9107", env = "HARBOR_EXPORTER_LISTEN")]
    listen: String,

    /// Path under which to expose metrics.
    #[arg(long, default_value = "/metrics", env = "HARBOR_EXPORTER_TELEMETRY_PATH")]
    telemetry_path: String,

    /// Instance name, inserted into every metric name as harbor_<instance>_<metric>.
    #[arg(long, default_value = "", env = "HARBOR_INSTANCE")]
    harbor_instance: String,

    /// Harbor server URL.
    #[arg(long, default_value = "http://localhost:8500", env = "HARBOR_URI")]
    harbor_server: String,

    /// Harbor username.
    #[arg(long, default_value = "admin", env = "HARBOR_USERNAME")]
    harbor_username: String,

    /// Harbor password.
    #[arg(long, default_value = "password", env = "HARBOR_PASSWORD", hide_env_values = true)]
    harbor_password: String,

    /// Timeout for each request to Harbor (e.g., "500ms", "10s", "1m").
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    harbor_timeout: Duration,

    /// Skip TLS certificate verification.
    #[arg(long)]
    harbor_insecure: bool,

    /// Page size for paginated Harbor listings.
    #[arg(long, default_value = "100", env = "HARBOR_PAGESIZE")]
    harbor_pagesize: usize,

    /// Metric groups to skip (comma-separated or repeated): health, scans,
    /// statistics, quotas, repositories, replication, systemvolumes,
    /// systeminfo, artifacts.
    #[arg(long, value_delimiter = ',')]
    skip_metrics: Vec<MetricGroup>,

    /// Replay group samples from a per-group cache instead of polling Harbor
    /// on every scrape.
    #[arg(long, env = "HARBOR_CACHE_ENABLED")]
    cache_enabled: bool,

    /// How long cached samples stay fresh.
    #[arg(long, default_value = "20s", env = "HARBOR_CACHE_DURATION", value_parser = parse_duration)]
    cache_duration: Duration,

    /// Worker pool size for per-project requests.
    #[arg(long, default_value = "4", env = "HARBOR_WORKERS")]
    workers: usize,

    /// Emit a <group>_latency gauge for every refreshed group.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    latency_metrics: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            server: self.harbor_server.clone(),
            username: self.harbor_username.clone(),
            password: self.harbor_password.clone(),
            timeout: self.harbor_timeout,
            insecure: self.harbor_insecure,
            page_size: self.harbor_pagesize,
            cache_enabled: self.cache_enabled,
            cache_ttl: self.cache_duration,
            workers: self.workers,
            latency_metrics: self.latency_metrics,
            instance: self.harbor_instance.clone(),
            ..CollectorConfig::default()
        }
        .skip_groups(&self.skip_metrics)
    }
}

/// Parses a human-readable duration ("500ms", "20s", "5m", "1h"). A bare
/// number is seconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (num_str, millis_per_unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, 1)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1000)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 60 * 1000)
    } else if let Some(num) = s.strip_suffix('h') {
        (num, 60 * 60 * 1000)
    } else {
        (s, 1000)
    };

    let n = num_str
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid duration '{}': {}", s, e))?;
    n.checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["harbor_exporter", "harbor_exporter_core"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================
// Router
// ============================================================

pub(crate) fn router(state: SharedState) -> Router {
    let telemetry_path = state.telemetry_path.clone();
    Router::new()
        .route(&telemetry_path, get(handlers::handle_metrics))
        .route("/", get(handlers::handle_index))
        .route("/-/healthy", get(handlers::handle_healthy))
        .route("/-/ready", get(handlers::handle_ready))
        .with_state(state)
        .layer(middleware::from_fn(access_log::log_request))
        .layer(CompressionLayer::new())
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };
    runtime.block_on(async_main(args));
}

async fn async_main(args: Args) {
    info!(version = VERSION, "harbor-exporter starting");

    if !args.telemetry_path.starts_with('/') || args.telemetry_path == "/" {
        error!(path = %args.telemetry_path, "telemetry path must start with '/' and not be '/'");
        process::exit(1);
    }

    let config = args.collector_config();
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        process::exit(1);
    }
    let groups: Vec<String> = config.enabled_groups.iter().map(|g| g.to_string()).collect();
    info!(
        server = %config.server,
        page_size = config.page_size,
        workers = config.workers,
        cache_enabled = config.cache_enabled,
        cache_ttl_s = config.cache_ttl.as_secs_f64(),
        groups = %groups.join(","),
        "configuration"
    );

    let client = match HarborClient::new(&config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to create harbor client");
            process::exit(1);
        }
    };
    let client = match client.detect_api_version().await {
        Ok(version) => {
            info!(base_path = version.base_path(), "detected harbor API version");
            client.with_api_version(version)
        }
        Err(e) => {
            error!(error = %e, "harbor API version detection failed");
            process::exit(1);
        }
    };

    let orchestrator = CollectionOrchestrator::new(&config, client);
    let state = AppInner::new(orchestrator, args.telemetry_path.clone(), config.server.clone());

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

    let addr: SocketAddr = match args.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(1);
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, path = %args.telemetry_path, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        process::exit(1);
    }
    info!("harbor-exporter stopped");
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("20s").unwrap(), Duration::from_secs(20));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration(" 15 ").unwrap(), Duration::from_secs(15));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("ten seconds").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        let err = parse_duration("9999999999999999h").unwrap_err();
        assert!(err.contains("too large"), "{err}");
        assert!(parse_duration(&format!("{}ms", u64::MAX)).is_ok());
        assert!(parse_duration(&format!("{}s", u64::MAX)).is_err());
    }

    #[test]
    fn test_invalid_instance_fails_validation() {
        let args = Args::parse_from(["harbor-exporter", "--harbor-instance", "prod-eu"]);
        assert!(args.collector_config().validate().is_err());
    }

    #[test]
    fn test_args_to_collector_config() {
        let args = Args::parse_from([
            "harbor-exporter",
            "--harbor-server",
            "https://harbor.example.com",
            "--skip-metrics",
            "artifacts,replication",
            "--cache-enabled",
            "--cache-duration",
            "1m",
            "--latency-metrics",
            "false",
        ]);
        let config = args.collector_config();

        assert_eq!(config.server, "https://harbor.example.com");
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert!(!config.latency_metrics);
        assert_eq!(config.enabled_groups.len(), MetricGroup::ALL.len() - 2);
        assert!(!config.enabled_groups.contains(&MetricGroup::Artifacts));
        assert!(!config.enabled_groups.contains(&MetricGroup::Replication));
    }

    #[test]
    fn test_unknown_group_rejected() {
        let result = Args::try_parse_from(["harbor-exporter", "--skip-metrics", "bogus"]);
        assert!(result.is_err());
    }
}
