// src/crawl/providers/spot_snapshot.rs
use chrono::{Local, TimeZone};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

/// Output column -> key in the feed's per-currency item.
const PRICE_FIELDS: [(&str, &str); 8] = [
    ("xau_price", "xauPrice"),
    ("xag_price", "xagPrice"),
    ("xau_change", "chgXau"),
    ("xag_change", "chgXag"),
    ("xau_percent_change", "pcXau"),
    ("xag_percent_change", "pcXag"),
    ("xau_close", "xauClose"),
    ("xag_close", "xagClose"),
];

#[derive(Debug, Deserialize)]
struct Snapshot {
    ts: Option<Value>,
    #[serde(default)]
    items: Vec<Map<String, Value>>,
}

fn epoch_millis(ts: &Value) -> Option<i64> {
    ts.as_i64().or_else(|| ts.as_f64().map(|f| f as i64))
}

/// Epoch milliseconds rendered in the host's local offset.
pub fn local_iso(millis: i64) -> Option<String> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.to_rfc3339())
}

pub fn parse(source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
    let snap: Snapshot = serde_json::from_slice(&raw.body)
        .map_err(|e| CrawlError::parse(source_key, format!("invalid spot json: {e}")))?;

    let item = snap
        .items
        .first()
        .ok_or_else(|| CrawlError::parse(source_key, "spot feed has no items"))?;

    let ts = snap.ts.unwrap_or(Value::Null);
    let datetime = epoch_millis(&ts).and_then(local_iso);
    let currency = item
        .get("curr")
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| Value::from("USD"));

    let rec = NormalizedRecord::new()
        .with("timestamp", ts)
        .with("datetime", datetime)
        .with("currency", currency);
    let rec = PRICE_FIELDS.iter().fold(rec, |rec, (name, key)| {
        rec.with(name, item.get(*key).cloned().unwrap_or(Value::Null))
    });
    Ok(vec![rec])
}
