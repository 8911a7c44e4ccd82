//! harbor-exporter-core — Harbor registry metrics collection.
//!
//! Provides:
//! - `client` — Harbor REST client, API version detection, pagination
//! - `collector` — per-group replay cache, sample relay, worker pool, scrape orchestration
//! - `groups` — metric groups and their record → sample mappings
//! - `metrics` — samples, descriptors and the metric catalog
//! - `config` — collector configuration
//! - `error` — fetch, decode and startup errors

pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod groups;
pub mod metrics;
