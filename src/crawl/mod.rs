// src/crawl/mod.rs
pub mod fetch;
pub mod providers;
pub mod registry;
pub mod types;

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};

use crate::config::AddressLookup;
use crate::crawl::fetch::Fetcher;
use crate::crawl::registry::{Registry, SourceDescriptor, SourceSpec};
use crate::crawl::types::{CrawlError, RecordBatch, SourceReport, SourceResult};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("crawl_sources_total", "Sources attempted across all cycles.");
        describe_counter!(
            "crawl_source_errors_total",
            "Sources that failed to fetch, resolve or parse."
        );
        describe_counter!("crawl_records_total", "Records emitted after normalization.");
        describe_histogram!("crawl_parse_ms", "Normalizer time in milliseconds.");
        describe_gauge!("crawl_last_cycle_ts", "Unix ts when a crawl cycle last finished.");
    });
}

pub fn crawl_time_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Stamps `source` and `crawl_time` onto every record.
pub fn annotate(records: RecordBatch, source: &str, crawl_time: &str) -> RecordBatch {
    records
        .into_iter()
        .map(|r| r.with("source", source).with("crawl_time", crawl_time))
        .collect()
}

/// Fetch, normalize and annotate one resolved source.
pub async fn crawl_descriptor(
    fetcher: &dyn Fetcher,
    source: &SourceDescriptor,
    label: &str,
) -> Result<RecordBatch, CrawlError> {
    ensure_metrics_described();

    let raw = fetcher.fetch(&source.url).await?;

    let t0 = std::time::Instant::now();
    let records = source.kind.normalize(&source.key, &raw)?;
    histogram!("crawl_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    tracing::debug!(source = %source.key, rows = records.len(), "normalized");
    counter!("crawl_records_total").increment(records.len() as u64);
    Ok(annotate(records, label, &crawl_time_now()))
}

/// Resolve + crawl one registry entry; never fails, errors become `Failure`.
pub async fn crawl_source(
    fetcher: &dyn Fetcher,
    spec: &SourceSpec,
    lookup: &dyn AddressLookup,
) -> SourceResult {
    ensure_metrics_described();
    counter!("crawl_sources_total").increment(1);

    let outcome = match spec.resolve(lookup) {
        Ok(d) => crawl_descriptor(fetcher, &d, &d.label()).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(records) => {
            tracing::info!(source = spec.key, rows = records.len(), "crawled");
            SourceResult::from_records(records)
        }
        Err(e) => {
            tracing::warn!(error = %e, source = spec.key, "crawl failed");
            counter!("crawl_source_errors_total").increment(1);
            SourceResult::Failure(e.to_string())
        }
    }
}

/// Results of one pass over a registry, in registry order.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub results: Vec<(String, SourceResult)>,
}

impl CycleReport {
    pub fn get(&self, key: &str) -> Option<&SourceResult> {
        self.results.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    /// `{KEY: {status, row_count?, data?, message?}, ...}`
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .results
            .iter()
            .map(|(k, r)| {
                let v = serde_json::to_value(SourceReport::from(r)).unwrap_or(Value::Null);
                (k.clone(), v)
            })
            .collect();
        Value::Object(map)
    }
}

/// Sequential pass over every source; one failure never stops the others.
pub async fn crawl_all(
    fetcher: &dyn Fetcher,
    registry: &Registry,
    lookup: &dyn AddressLookup,
) -> CycleReport {
    let started_at = Utc::now();
    let mut results = Vec::with_capacity(registry.specs().len());

    for spec in registry.specs() {
        tracing::info!(source = spec.key, "crawling");
        let result = crawl_source(fetcher, spec, lookup).await;
        results.push((spec.key.to_string(), result));
    }

    gauge!("crawl_last_cycle_ts").set(Utc::now().timestamp() as f64);
    CycleReport {
        started_at,
        results,
    }
}
