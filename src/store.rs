// src/store.rs
//! Persistence collaborator: typed rows when a batch carries `name`/`buy`/`sell`,
//! raw JSON otherwise, plus CSV export to an object store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::crawl::types::{NormalizedRecord, SourceResult};
use crate::crawl::CycleReport;

const TYPED_COLUMNS: [&str; 3] = ["name", "buy", "sell"];

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StoredRow {
    pub id: u64,
    pub source: String,
    pub crawl_time: DateTime<Utc>,
    pub name: Option<String>,
    pub buy: Option<String>,
    pub sell: Option<String>,
    pub raw_data: String,
}

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns the number of rows written.
    async fn insert_batch(
        &self,
        source: &str,
        crawl_time: Option<DateTime<Utc>>,
        records: &[NormalizedRecord],
    ) -> Result<usize>;
    async fn query_all(&self) -> Result<Vec<StoredRow>>;
    async fn query_by_source(&self, source: &str) -> Result<Vec<StoredRow>>;
    /// Rows of the most recent crawl of `source`; empty if never crawled.
    async fn query_latest_by_source(&self, source: &str) -> Result<Vec<StoredRow>>;
}

pub fn has_typed_columns(records: &[NormalizedRecord]) -> bool {
    records
        .first()
        .is_some_and(|r| TYPED_COLUMNS.iter().all(|c| r.contains(c)))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Vec<StoredRow> {
        self.rows.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn insert_batch(
        &self,
        source: &str,
        crawl_time: Option<DateTime<Utc>>,
        records: &[NormalizedRecord],
    ) -> Result<usize> {
        let crawl_time = crawl_time.unwrap_or_else(Utc::now);
        let typed = has_typed_columns(records);
        if !typed {
            tracing::warn!(source, "batch lacks name/buy/sell, storing raw_data only");
        }

        let mut rows = self
            .rows
            .lock()
            .map_err(|_| anyhow::anyhow!("store mutex poisoned"))?;
        for r in records {
            let id = rows.len() as u64 + 1;
            let field = |c: &str| if typed { r.field_text(c) } else { None };
            rows.push(StoredRow {
                id,
                source: source.to_string(),
                crawl_time,
                name: field("name"),
                buy: field("buy"),
                sell: field("sell"),
                raw_data: r.to_json_string(),
            });
        }
        Ok(records.len())
    }

    async fn query_all(&self) -> Result<Vec<StoredRow>> {
        Ok(self.snapshot())
    }

    async fn query_by_source(&self, source: &str) -> Result<Vec<StoredRow>> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| r.source == source)
            .collect())
    }

    async fn query_latest_by_source(&self, source: &str) -> Result<Vec<StoredRow>> {
        let rows = self.query_by_source(source).await?;
        let Some(latest) = rows.iter().map(|r| r.crawl_time).max() else {
            return Ok(Vec::new());
        };
        Ok(rows.into_iter().filter(|r| r.crawl_time == latest).collect())
    }
}

/// Render a rectangular batch as CSV with a header row.
pub fn export_csv(records: &[NormalizedRecord]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if let Some(first) = records.first() {
        let header: Vec<&str> = first.field_names().collect();
        wtr.write_record(&header).context("csv header")?;
        for r in records {
            let row: Vec<String> = header
                .iter()
                .map(|c| r.field_text(c).unwrap_or_default())
                .collect();
            wtr.write_record(&row).context("csv row")?;
        }
    }

    let bytes = wtr.into_inner().context("csv flush")?;
    String::from_utf8(bytes).context("csv utf-8")
}

#[async_trait::async_trait]
pub trait ObjectSink: Send + Sync {
    async fn put_object(&self, path: &str, body: String) -> Result<()>;
}

/// Export a batch as CSV under `path` in the sink.
pub async fn export_to_object_store<S: ObjectSink + ?Sized>(
    sink: &S,
    records: &[NormalizedRecord],
    path: &str,
) -> Result<()> {
    let body = export_csv(records)?;
    sink.put_object(path, body)
        .await
        .with_context(|| format!("uploading {path}"))?;
    tracing::info!(path, rows = records.len(), "exported batch");
    Ok(())
}

/// Export every successful batch of a cycle as `<prefix>/<date>/<source>.csv`.
/// Returns the object paths written, in registry order.
pub async fn export_cycle<S: ObjectSink + ?Sized>(
    sink: &S,
    report: &CycleReport,
    prefix: &str,
) -> Result<Vec<String>> {
    let day = report.started_at.format("%Y-%m-%d");
    let mut paths = Vec::new();
    for (key, result) in &report.results {
        if let SourceResult::Success(rows) = result {
            let path = format!("{prefix}/{day}/{}.csv", key.to_lowercase());
            export_to_object_store(sink, rows, &path).await?;
            paths.push(path);
        }
    }
    Ok(paths)
}

// --- Test helper ---
pub struct MemoryObjectSink {
    pub objects: Mutex<Vec<(String, String)>>,
}

impl MemoryObjectSink {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(vec![]),
        }
    }
}

impl Default for MemoryObjectSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ObjectSink for MemoryObjectSink {
    async fn put_object(&self, path: &str, body: String) -> Result<()> {
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("sink mutex poisoned"))?
            .push((path.to_string(), body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quote(name: &str, buy: &str, sell: &str) -> NormalizedRecord {
        NormalizedRecord::new()
            .with("name", name)
            .with("buy", buy)
            .with("sell", sell)
    }

    #[tokio::test]
    async fn typed_batches_fill_columns() {
        let store = MemoryStore::new();
        let n = store
            .insert_batch("doji_daily", None, &[quote("SJC", "8,550", "8,650")])
            .await
            .unwrap();
        assert_eq!(n, 1);
        let rows = store.query_all().await.unwrap();
        assert_eq!(rows[0].name.as_deref(), Some("SJC"));
        assert_eq!(rows[0].sell.as_deref(), Some("8,650"));
        assert!(rows[0].raw_data.contains("\"buy\":\"8,550\""));
    }

    #[tokio::test]
    async fn untyped_batches_store_raw_json_only() {
        let store = MemoryStore::new();
        let rec = NormalizedRecord::new()
            .with("timestamp_hour", "1000")
            .with("price_usd_per_oz", "2650.5");
        store.insert_batch("world", None, &[rec]).await.unwrap();
        let rows = store.query_by_source("world").await.unwrap();
        assert_eq!(rows[0].name, None);
        assert_eq!(rows[0].buy, None);
        assert!(rows[0].raw_data.contains("price_usd_per_oz"));
    }

    #[tokio::test]
    async fn latest_by_source_picks_newest_crawl() {
        let store = MemoryStore::new();
        let t1 = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 10, 2, 8, 0, 0).unwrap();
        store.insert_batch("a", Some(t2), &[quote("new", "1", "2")]).await.unwrap();
        store.insert_batch("a", Some(t1), &[quote("old", "1", "2")]).await.unwrap();
        store.insert_batch("b", Some(t2), &[quote("other", "1", "2")]).await.unwrap();

        let latest = store.query_latest_by_source("a").await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].name.as_deref(), Some("new"));
        assert!(store.query_latest_by_source("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn csv_export_lands_in_sink() {
        let sink = MemoryObjectSink::new();
        let recs = vec![quote("SJC", "1", "2"), quote("Nhẫn, 9999", "3", "4")];
        export_to_object_store(&sink, &recs, "gold/2026-10-14.csv")
            .await
            .unwrap();
        let objects = sink.objects.lock().unwrap();
        assert_eq!(objects[0].0, "gold/2026-10-14.csv");
        assert_eq!(
            objects[0].1,
            "name,buy,sell\nSJC,1,2\n\"Nhẫn, 9999\",3,4\n"
        );
    }

    #[tokio::test]
    async fn cycle_export_writes_only_successful_sources() {
        let report = CycleReport {
            started_at: Utc.with_ymd_and_hms(2026, 10, 14, 1, 30, 0).unwrap(),
            results: vec![
                (
                    "SJC_DAILY".to_string(),
                    SourceResult::Success(vec![quote("SJC", "1", "2")]),
                ),
                ("PNJ_DAILY".to_string(), SourceResult::Empty),
                ("DOJI_DAILY".to_string(), SourceResult::Failure("boom".into())),
            ],
        };
        let sink = MemoryObjectSink::new();
        let paths = export_cycle(&sink, &report, "gold").await.unwrap();
        assert_eq!(paths, vec!["gold/2026-10-14/sjc_daily.csv".to_string()]);

        let objects = sink.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].1, "name,buy,sell\nSJC,1,2\n");
    }
}
