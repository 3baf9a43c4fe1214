// src/lib.rs
// Public library surface for the server, the batch bin and integration tests.

pub mod api;
pub mod config;
pub mod crawl;
pub mod metrics;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, SourceResult};
pub use crate::crawl::{crawl_all, CycleReport};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing to stderr; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gold_price_crawler=info,warn"));

    // try_init: a second call (tests, re-entry) is a no-op
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
