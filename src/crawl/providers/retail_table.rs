// src/crawl/providers/retail_table.rs
use once_cell::sync::OnceCell;
use scraper::{Html, Selector};
use serde_json::Value;

use super::{element_text, selector};
use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

const FULL_WIDTH: usize = 5;

fn selectors() -> &'static (Selector, Selector, Selector) {
    static SEL: OnceCell<(Selector, Selector, Selector)> = OnceCell::new();
    SEL.get_or_init(|| (selector("table"), selector("tr"), selector("td, th")))
}

/// Header cell text with leftover markup fragments removed.
fn column_name(cell: Option<&str>) -> String {
    cell.unwrap_or("none")
        .replace(r#"<th class="style1">"#, "")
        .replace("</th>", "")
        .trim()
        .to_lowercase()
}

/// 5-cell rows as-is, 4-cell rows left-padded with one absent cell, others dropped.
fn shape_row(cells: Vec<String>) -> Option<Vec<Option<String>>> {
    match cells.len() {
        FULL_WIDTH => Some(cells.into_iter().map(Some).collect()),
        n if n == FULL_WIDTH - 1 => Some(
            std::iter::once(None)
                .chain(cells.into_iter().map(Some))
                .collect(),
        ),
        _ => None,
    }
}

pub fn parse(source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
    let (table_sel, row_sel, cell_sel) = selectors();
    let doc = Html::parse_document(&raw.text());

    let table = doc
        .select(table_sel)
        .next()
        .ok_or_else(|| CrawlError::parse(source_key, "no <table> in document"))?;

    let mut rows = table.select(row_sel).filter_map(|tr| {
        shape_row(tr.select(cell_sel).map(element_text).collect())
    });

    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| CrawlError::parse(source_key, "table has no 4- or 5-cell rows"))?
        .iter()
        .map(|c| column_name(c.as_deref()))
        .collect();

    Ok(rows
        .map(|cells| {
            header
                .iter()
                .zip(cells)
                .fold(NormalizedRecord::new(), |rec, (name, cell)| {
                    rec.with(name, cell.map(Value::String).unwrap_or(Value::Null))
                })
        })
        .collect())
}
