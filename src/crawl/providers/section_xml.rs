// src/crawl/providers/section_xml.rs
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "DGPlist")]
    dgp_list: Option<Section>,
    #[serde(rename = "JewelryList")]
    jewelry_list: Option<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    #[serde(rename = "DateTime")]
    date_time: Option<String>,
    #[serde(rename = "Row", default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "@Name")]
    name: Option<String>,
    #[serde(rename = "@Key")]
    key: Option<String>,
    #[serde(rename = "@Sell")]
    sell: Option<String>,
    #[serde(rename = "@Buy")]
    buy: Option<String>,
}

fn section_records(section: Option<Section>) -> impl Iterator<Item = NormalizedRecord> {
    let (time, rows) = section
        .map(|s| (s.date_time, s.rows))
        .unwrap_or_default();
    rows.into_iter().map(move |r| {
        NormalizedRecord::new()
            .with("name", r.name)
            .with("key", r.key)
            .with("sell", r.sell)
            .with("buy", r.buy)
            .with("time", time.clone())
    })
}

pub fn parse(source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
    let text = std::str::from_utf8(&raw.body)
        .map_err(|e| CrawlError::parse(source_key, format!("feed is not utf-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let feed: Feed = from_str(text)
        .map_err(|e| CrawlError::parse(source_key, format!("invalid xml: {e}")))?;

    Ok(section_records(feed.dgp_list)
        .chain(section_records(feed.jewelry_list))
        .collect())
}
