// src/crawl/providers/flat_json.rs
use super::parse_json;
use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

pub fn parse(source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
    let doc = parse_json(source_key, raw)?;
    let items = doc
        .as_array()
        .ok_or_else(|| CrawlError::parse(source_key, "expected a json list of objects"))?;

    items
        .iter()
        .map(|item| {
            let obj = item
                .as_object()
                .ok_or_else(|| CrawlError::parse(source_key, "list element is not an object"))?;
            Ok(obj
                .iter()
                .fold(NormalizedRecord::new(), |rec, (k, v)| rec.with(k, v.clone())))
        })
        .collect()
}
