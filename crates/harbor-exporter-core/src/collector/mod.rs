//! Collection pipeline: per-group caching, fan-in relay and scrape orchestration.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   CollectionOrchestrator                     │
//! │                                                              │
//! │   ┌────────────────┐  ┌────────────────┐   ┌──────────────┐  │
//! │   │ GroupCollector │  │ GroupCollector │   │     ...      │  │
//! │   │  ReplayCache   │  │  ReplayCache   │   │              │  │
//! │   └───────┬────────┘  └───────┬────────┘   └──────┬───────┘  │
//! │     replay│or refresh         │                   │          │
//! │   ┌───────▼────────┐  ┌───────▼────────┐          │          │
//! │   │  SampleRelay   │  │  SampleRelay   │          │          │
//! │   └───────┬────────┘  └───────┬────────┘          │          │
//! │           └──────────┬────────┴───────────────────┘          │
//! │                 ┌────▼─────┐                                 │
//! │                 │   out    │ ──► liveness ──► Scrape         │
//! │                 └──────────┘                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each group runs as its own task. On a cache miss the group's producer
//! fetches from Harbor through the [`PagedFetcher`](crate::client::PagedFetcher)
//! and writes into its relay, which forwards into the shared output stream and
//! mirrors into the cache. Groups never share state; the only lock is the
//! per-group cache lock.
//!
//! # Usage
//!
//! ```ignore
//! use harbor_exporter_core::client::HarborClient;
//! use harbor_exporter_core::collector::CollectionOrchestrator;
//! use harbor_exporter_core::config::CollectorConfig;
//!
//! let config = CollectorConfig::default();
//! let client = HarborClient::new(&config)?;
//! let orchestrator = CollectionOrchestrator::new(&config, client);
//! let scrape = orchestrator.scrape().await;
//! println!("up = {}", scrape.up);
//! ```

mod cache;
mod group;
mod orchestrator;
mod pool;
mod relay;

#[cfg(test)]
pub(crate) mod testing;

use tokio::sync::mpsc;

use crate::metrics::Sample;

pub use cache::{RefreshPermit, Replay, ReplayCache};
pub use group::{GroupCollector, GroupResult};
pub use orchestrator::{CollectionOrchestrator, Scrape, liveness};
pub use pool::WorkPool;
pub use relay::{RefreshHandle, SampleRelay, SampleSender, emit};

/// The shared output stream every group writes into during a scrape.
pub type SampleSink = mpsc::UnboundedSender<Sample>;
