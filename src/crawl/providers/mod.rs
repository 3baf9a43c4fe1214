// src/crawl/providers/mod.rs
pub mod aggregator_json;
pub mod flat_json;
pub mod history_tables;
pub mod price_list_table;
pub mod retail_table;
pub mod section_xml;
pub mod spot_history;
pub mod spot_snapshot;

use scraper::{ElementRef, Selector};
use serde_json::Value;

use crate::crawl::registry::SourceKind;
use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

impl SourceKind {
    /// Parse one raw response into a rectangular record set.
    pub fn normalize(self, source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
        let rows = match self {
            SourceKind::AggregatorJson => aggregator_json::parse(source_key, raw)?,
            SourceKind::FlatJson => flat_json::parse(source_key, raw)?,
            SourceKind::RetailTable => retail_table::parse(source_key, raw)?,
            SourceKind::PriceListTable => price_list_table::parse(source_key, raw)?,
            SourceKind::HistoryTables => history_tables::parse(source_key, raw)?,
            SourceKind::SectionXml => section_xml::parse(source_key, raw)?,
            SourceKind::SpotSnapshot => spot_snapshot::parse(source_key, raw)?,
            SourceKind::SpotHistory => spot_history::parse(source_key, raw)?,
        };
        into_table(source_key, rows)
    }
}

/// Aligns every record to the union of columns (first-seen order), filling
/// gaps with null, then checks the result is rectangular.
pub fn into_table(source_key: &str, rows: RecordBatch) -> Result<RecordBatch, CrawlError> {
    let mut columns: Vec<String> = Vec::new();
    for r in &rows {
        for name in r.field_names() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }

    let table: RecordBatch = rows
        .into_iter()
        .map(|r| {
            columns.iter().fold(NormalizedRecord::new(), |acc, c| {
                acc.with(c, r.get(c).cloned().unwrap_or(Value::Null))
            })
        })
        .collect();

    if !is_rectangular(&table) {
        return Err(CrawlError::parse(source_key, "records do not share one column set"));
    }
    Ok(table)
}

/// True when every record has the same ordered field names.
pub fn is_rectangular(rows: &[NormalizedRecord]) -> bool {
    let Some(first) = rows.first() else {
        return true;
    };
    let head: Vec<&str> = first.field_names().collect();
    rows.iter()
        .all(|r| r.field_names().eq(head.iter().copied()))
}

pub(crate) fn parse_json(source_key: &str, raw: &RawResponse) -> Result<Value, CrawlError> {
    serde_json::from_slice(&raw.body)
        .map_err(|e| CrawlError::parse(source_key, format!("invalid json: {e}")))
}

/// Text of an element with every text node trimmed, then concatenated.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static css selector")
}
