//! In-process mock of the Harbor API for tests.
//!
//! Serves canned JSON per path (optionally paginated by the `page` query
//! parameter), records every request and answers 404 for unknown paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::Response;

use crate::client::HarborClient;
use crate::config::CollectorConfig;
use crate::groups::GroupContext;

#[derive(Clone)]
enum Route {
    Fixed(String),
    Paged {
        pages: Vec<String>,
        total_count: Option<String>,
    },
    Failing(u16),
}

#[derive(Default)]
struct MockState {
    routes: HashMap<String, Route>,
    delay: Option<Duration>,
    requests: Mutex<Vec<String>>,
}

#[derive(Default)]
pub(crate) struct MockHarbor {
    state: MockState,
}

impl MockHarbor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(mut self, path: &str, body: &str) -> Self {
        self.state
            .routes
            .insert(path.to_string(), Route::Fixed(body.to_string()));
        self
    }

    /// Serves `pages[page - 1]` (or `[]` past the end) with an optional
    /// `x-total-count` header.
    pub(crate) fn paged_route(mut self, path: &str, pages: Vec<String>, total_count: Option<&str>) -> Self {
        self.state.routes.insert(
            path.to_string(),
            Route::Paged {
                pages,
                total_count: total_count.map(str::to_string),
            },
        );
        self
    }

    pub(crate) fn failing_route(mut self, path: &str, status: u16) -> Self {
        self.state.routes.insert(path.to_string(), Route::Failing(status));
        self
    }

    /// Delays every response.
    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.state.delay = Some(delay);
        self
    }

    pub(crate) async fn start(self) -> RunningMock {
        let state = Arc::new(self.state);
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        RunningMock {
            url: format!("http://{addr}"),
            state,
        }
    }
}

pub(crate) struct RunningMock {
    pub(crate) url: String,
    state: Arc<MockState>,
}

impl RunningMock {
    /// Default configuration pointed at this mock, caching off.
    pub(crate) fn config(&self) -> CollectorConfig {
        CollectorConfig {
            server: self.url.clone(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Every request so far as `path?query`, in arrival order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Number of requests for `path`, ignoring the query string.
    pub(crate) fn hits(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.split('?').next() == Some(path))
            .count()
    }
}

/// Group context for a v2 Harbor at the configured server.
pub(crate) fn context(config: &CollectorConfig) -> Arc<GroupContext> {
    Arc::new(GroupContext::new(HarborClient::new(config).unwrap(), config))
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri) -> Response {
    let recorded = match uri.query() {
        Some(q) => format!("{}?{q}", uri.path()),
        None => uri.path().to_string(),
    };
    state.requests.lock().unwrap().push(recorded);

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    let page: usize = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);

    let builder = Response::builder().header(header::CONTENT_TYPE, "application/json");
    match state.routes.get(uri.path()) {
        Some(Route::Fixed(body)) => builder.body(Body::from(body.clone())).unwrap(),
        Some(Route::Paged { pages, total_count }) => {
            let body = pages.get(page.saturating_sub(1)).cloned().unwrap_or_else(|| "[]".to_string());
            let builder = match total_count {
                Some(total) => builder.header("x-total-count", total.as_str()),
                None => builder,
            };
            builder.body(Body::from(body)).unwrap()
        }
        Some(Route::Failing(status)) => builder
            .status(StatusCode::from_u16(*status).unwrap())
            .body(Body::from("{\"errors\":[]}"))
            .unwrap(),
        None => builder
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("{\"errors\":[{\"code\":\"NOT_FOUND\"}]}"))
            .unwrap(),
    }
}
