//! Harbor REST API client.
//!
//! Thin wrapper over `reqwest` that adds basic auth, the detected API base
//! path and uniform error mapping. Paginated listings go through
//! [`PagedFetcher`].

mod paging;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::CollectorConfig;
use crate::error::{CollectError, ConfigError, DecodeError, FetchError};

pub use paging::{PageCursor, PagedFetcher};

const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Harbor API generation, selected by probing `systeminfo` at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    pub fn base_path(self) -> &'static str {
        match self {
            ApiVersion::V1 => "/api",
            ApiVersion::V2 => "/api/v2.0",
        }
    }
}

/// One successful response: the raw body plus the pagination header, if any.
#[derive(Debug)]
pub struct Response {
    pub body: Vec<u8>,
    pub total_count: Option<String>,
}

/// HTTP client bound to one Harbor instance. Cheap to clone.
#[derive(Clone)]
pub struct HarborClient {
    http: reqwest::Client,
    server: String,
    username: String,
    password: String,
    api_version: ApiVersion,
    page_size: usize,
}

impl HarborClient {
    /// Builds a client for the configured server. The API version defaults to
    /// v2 until [`detect_api_version`](Self::detect_api_version) says otherwise.
    pub fn new(config: &CollectorConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self {
            http,
            server: config.server.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            api_version: ApiVersion::V2,
            page_size: config.page_size,
        })
    }

    pub fn with_api_version(mut self, api_version: ApiVersion) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Paginated access to listings, using the configured page size.
    pub fn pages(&self) -> PagedFetcher<'_> {
        PagedFetcher::new(self, self.page_size)
    }

    /// Probes `/api/systeminfo` and `/api/v2.0/systeminfo`. When both answer,
    /// v2 wins.
    pub async fn detect_api_version(&self) -> Result<ApiVersion, ConfigError> {
        let mut detected = None;
        for version in [ApiVersion::V1, ApiVersion::V2] {
            let url = format!("{}{}/systeminfo", self.server, version.base_path());
            match self.http.get(&url).send().await {
                Ok(resp) => {
                    info!(url, code = resp.status().as_u16(), "probed harbor API");
                    if resp.status() == StatusCode::OK {
                        detected = Some(version);
                    }
                }
                Err(e) => info!(url, error = %e, "harbor API probe failed"),
            }
        }
        detected.ok_or_else(|| ConfigError::ApiVersion(self.server.clone()))
    }

    /// Issues one authenticated GET for `endpoint` (relative to the API base
    /// path). Any non-success status is an error.
    pub async fn get(&self, endpoint: &str) -> Result<Response, FetchError> {
        debug!(endpoint, "requesting");
        let url = format!("{}{}{}", self.server, self.api_version.base_path(), endpoint);

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|source| {
                warn!(endpoint, error = %source, "request failed");
                FetchError::Transport {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "request returned error status");
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }

        let total_count = resp
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        let body = resp.bytes().await.map_err(|source| FetchError::Body {
            endpoint: endpoint.to_string(),
            source,
        })?;

        Ok(Response {
            body: body.to_vec(),
            total_count,
        })
    }

    /// Fetches a single (non-paginated) resource and decodes it.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, CollectError> {
        let resp = self.get(endpoint).await?;
        Ok(decode(endpoint, &resp.body)?)
    }
}

impl std::fmt::Debug for HarborClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarborClient")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("api_version", &self.api_version)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// Decodes a JSON body, attributing failures to `endpoint`.
pub fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(body).map_err(|source| DecodeError {
        endpoint: endpoint.to_string(),
        source,
    })
}
