//! HTTP request handlers: metrics endpoint, landing page and probes.

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, error};

use crate::access_log::ScrapeOutcome;
use crate::exposition;
use crate::state::{SharedState, release_memory_to_os};

// ============================================================
// Metrics
// ============================================================

/// Runs one scrape and renders it. Concurrent requests wait for the running
/// scrape to finish.
pub(crate) async fn handle_metrics(State(state): State<SharedState>) -> Response {
    let _scrape = state.scrape_lock.lock().await;
    let scrape = state.orchestrator.scrape().await;
    debug!(up = scrape.up, samples = scrape.samples.len(), "scrape finished");

    let outcome = ScrapeOutcome {
        up: scrape.up,
        samples: scrape.samples.len(),
        failed: scrape.results.iter().filter(|r| !r.ok).map(|r| r.group).collect(),
    };
    let encoded = exposition::encode(&scrape.samples);
    drop(scrape);
    release_memory_to_os();

    match encoded {
        Ok((body, content_type)) => Response::builder()
            .header(header::CONTENT_TYPE, content_type)
            .extension(outcome)
            .body(Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

// ============================================================
// Landing page and probes
// ============================================================

pub(crate) async fn handle_index(State(state): State<SharedState>) -> Html<String> {
    let groups: Vec<String> = state.orchestrator.groups().map(|g| g.to_string()).collect();
    Html(format!(
        "<html>\n\
         <head><title>Harbor Exporter</title></head>\n\
         <body>\n\
         <h1>Harbor Exporter</h1>\n\
         <p>Version {version} ({sha}), scraping {server}</p>\n\
         <p>Metric groups: {groups}</p>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        version = env!("CARGO_PKG_VERSION"),
        sha = env!("GIT_SHA"),
        server = state.harbor_server,
        groups = groups.join(", "),
        path = state.telemetry_path,
    ))
}

pub(crate) async fn handle_healthy() -> &'static str {
    "OK"
}

pub(crate) async fn handle_ready() -> &'static str {
    "OK"
}
