// src/crawl/providers/aggregator_json.rs
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;

use super::parse_json;
use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

/// `@n_1` -> `n`: drop leading `@` markers, then a trailing `_<digits>`.
pub fn canonical_name(key: &str) -> String {
    static RE_SUFFIX: OnceCell<Regex> = OnceCell::new();
    let re = RE_SUFFIX.get_or_init(|| Regex::new(r"_\d+$").expect("static regex"));
    re.replace(key.trim_start_matches('@'), "").into_owned()
}

pub fn parse(source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
    let doc = parse_json(source_key, raw)?;
    let data = doc
        .pointer("/DataList/Data")
        .ok_or_else(|| CrawlError::parse(source_key, "missing DataList.Data"))?;

    let Value::Array(items) = data else {
        return Err(CrawlError::parse(source_key, "DataList.Data is not a list"));
    };

    items
        .iter()
        .map(|item| {
            let obj = item
                .as_object()
                .ok_or_else(|| CrawlError::parse(source_key, "DataList.Data item is not an object"))?;
            Ok(obj.iter().fold(NormalizedRecord::new(), |rec, (k, v)| {
                rec.with(&canonical_name(k), v.clone())
            }))
        })
        .collect()
}
