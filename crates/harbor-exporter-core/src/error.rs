//! Error types for upstream collection and startup validation.
//!
//! Fetch and decode failures never leave a group collector: they are logged
//! and downgraded to `ok = false` in the group's result.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to obtain a response body from the Harbor API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or timeout failure.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status code.
    #[error("request to {endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: StatusCode },
    /// The `x-total-count` header is present but not an integer.
    #[error("invalid x-total-count header {value:?} from {endpoint}")]
    TotalCount { endpoint: String, value: String },
    /// The body could not be read to completion.
    #[error("failed to read response of {endpoint}: {source}")]
    Body {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Malformed JSON or unexpected response shape.
#[derive(Debug, Error)]
#[error("failed to decode response of {endpoint}: {source}")]
pub struct DecodeError {
    pub endpoint: String,
    #[source]
    pub source: serde_json::Error,
}

/// Any failure that aborts one group's collection.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A producer or worker task panicked, or the relay went away.
    #[error("collection task failed: {0}")]
    TaskFailed(String),
}

/// Startup errors: invalid configuration or an unreachable Harbor.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("page size must be greater than zero")]
    PageSize,
    #[error("worker pool size must be greater than zero")]
    Workers,
    #[error("instance name {0:?} is not a valid metric name component")]
    Instance(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("unable to determine harbor API version at {0}")]
    ApiVersion(String),
}
