//! Shared application state and the process allocator.

use std::sync::Arc;

use tokio::sync::Mutex;

use harbor_exporter_core::collector::CollectionOrchestrator;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub(crate) struct AppInner {
    pub(crate) orchestrator: CollectionOrchestrator,
    /// Held for the duration of one scrape.
    pub(crate) scrape_lock: Mutex<()>,
    pub(crate) telemetry_path: String,
    pub(crate) harbor_server: String,
}

pub(crate) type SharedState = Arc<AppInner>;

impl AppInner {
    pub(crate) fn new(
        orchestrator: CollectionOrchestrator,
        telemetry_path: String,
        harbor_server: String,
    ) -> SharedState {
        Arc::new(Self {
            orchestrator,
            scrape_lock: Mutex::new(()),
            telemetry_path,
            harbor_server,
        })
    }
}

/// Purges dirty pages of every jemalloc arena.
#[cfg(not(target_env = "msvc"))]
pub(crate) fn release_memory_to_os() {
    // 4096 is MALLCTL_ARENAS_ALL.
    let rc = unsafe {
        tikv_jemalloc_sys::mallctl(
            c"arena.4096.purge".as_ptr().cast(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        tracing::debug!(rc, "jemalloc arena purge failed");
    }
}

#[cfg(target_env = "msvc")]
pub(crate) fn release_memory_to_os() {}
