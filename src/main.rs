//! Gold Price Crawler — Binary Entrypoint
//! Boots the Axum HTTP server with the live fetcher, address lookup and metrics.

use std::sync::Arc;

use gold_price_crawler::config::LayeredLookup;
use gold_price_crawler::crawl::fetch::HttpFetcher;
use gold_price_crawler::metrics::Metrics;
use gold_price_crawler::{api, init_tracing};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let lookup = LayeredLookup::from_env()?;
    let state = api::AppState::new(Arc::new(HttpFetcher::from_env()), Arc::new(lookup));

    let metrics = Metrics::init(state.registry.specs().len())?;
    let router = api::router(state).merge(metrics.router());

    tracing::info!("gold price crawler ready");
    Ok(router.into())
}
