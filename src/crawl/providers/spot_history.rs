// src/crawl/providers/spot_history.rs
use chrono::DateTime;
use chrono_tz::America::New_York;
use serde_json::Value;

use super::parse_json;
use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

/// Stream timestamps count hundreds of seconds since the epoch.
const SECONDS_PER_TICK: i64 = 100;

/// Encoded timestamp token -> RFC 3339 instant in New York time.
pub fn decode_timestamp(source_key: &str, token: &str) -> Result<String, CrawlError> {
    let ticks: i64 = token
        .trim()
        .parse()
        .map_err(|e| CrawlError::parse(source_key, format!("bad timestamp {token:?}: {e}")))?;
    let utc = ticks
        .checked_mul(SECONDS_PER_TICK)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| CrawlError::parse(source_key, format!("timestamp {token:?} out of range")))?;
    Ok(utc.with_timezone(&New_York).to_rfc3339())
}

pub fn parse(source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
    let doc = parse_json(source_key, raw)?;
    let packed = doc
        .as_array()
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .ok_or_else(|| CrawlError::parse(source_key, "expected a list holding one packed string"))?;

    // first token is the series marker, e.g. "USD-XAU!"
    let tokens: Vec<&str> = packed.split(',').skip(1).collect();
    if tokens.len() % 2 != 0 {
        return Err(CrawlError::parse(
            source_key,
            format!("odd token count {}: unpaired timestamp or price", tokens.len()),
        ));
    }

    tokens
        .chunks_exact(2)
        .map(|pair| {
            let (ts, price) = (pair[0], pair[1]);
            Ok(NormalizedRecord::new()
                .with("timestamp_hour", ts)
                .with("datetime_ny", decode_timestamp(source_key, ts)?)
                .with("price_usd_per_oz", price))
        })
        .collect()
}
