//! Access log middleware: one line per request. Scrapes also log their outcome.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info, warn};

use harbor_exporter_core::groups::MetricGroup;

/// Attached to the `/metrics` response by the handler.
#[derive(Debug, Clone)]
pub(crate) struct ScrapeOutcome {
    pub(crate) up: bool,
    pub(crate) samples: usize,
    pub(crate) failed: Vec<MetricGroup>,
}

pub(crate) async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_owned(), |ci| ci.0.ip().to_string());
    let t0 = Instant::now();

    let response = next.run(req).await;

    let latency_ms = t0.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    match response.extensions().get::<ScrapeOutcome>() {
        Some(outcome) if outcome.up => {
            info!(client, status, latency_ms, samples = outcome.samples, "{method} {path}");
        }
        Some(outcome) => {
            let failed: Vec<&str> = outcome.failed.iter().map(|g| g.as_str()).collect();
            warn!(
                client,
                status,
                latency_ms,
                samples = outcome.samples,
                failed = %failed.join(","),
                "{method} {path}: harbor down"
            );
        }
        None if path.starts_with("/-/") => debug!(client, status, latency_ms, "{method} {path}"),
        None => info!(client, status, latency_ms, "{method} {path}"),
    }
    response
}
