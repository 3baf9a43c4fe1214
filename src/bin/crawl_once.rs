//! One aggregation cycle over the daily sources, for cron-style runs.
//!
//! Batches land in an in-memory store. With `--csv`, successful batches are
//! also exported through an in-memory object sink and printed (dry run).
//!
//! `cargo run --bin crawl_once -- [--csv]`

use anyhow::Result;
use gold_price_crawler::config::LayeredLookup;
use gold_price_crawler::crawl::fetch::HttpFetcher;
use gold_price_crawler::crawl::registry::Registry;
use gold_price_crawler::store::{export_cycle, MemoryObjectSink, MemoryStore, RecordStore};
use gold_price_crawler::{crawl_all, init_tracing, SourceResult};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let dry_run_csv = std::env::args().any(|a| a == "--csv");

    let lookup = LayeredLookup::from_env()?;
    let fetcher = HttpFetcher::from_env();
    let report = crawl_all(&fetcher, &Registry::daily(), &lookup).await;

    let store = MemoryStore::new();
    for (key, result) in &report.results {
        match result {
            SourceResult::Success(rows) => {
                tracing::info!(source = %key, rows = rows.len(), "batch ready");
                store
                    .insert_batch(&key.to_lowercase(), Some(report.started_at), rows)
                    .await?;
            }
            SourceResult::Empty => tracing::warn!(source = %key, "no valid data"),
            SourceResult::Failure(msg) => tracing::warn!(source = %key, error = %msg, "crawl failed"),
        }
    }

    if dry_run_csv {
        let sink = MemoryObjectSink::new();
        export_cycle(&sink, &report, "gold").await?;
        let objects = sink
            .objects
            .lock()
            .map_err(|_| anyhow::anyhow!("sink mutex poisoned"))?;
        for (path, body) in objects.iter() {
            println!("# {path}\n{body}");
        }
    }

    let stored = store.query_all().await?.len();
    tracing::info!(stored, sources = report.results.len(), "cycle finished");
    Ok(())
}
