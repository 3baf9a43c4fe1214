// src/crawl/providers/price_list_table.rs
use once_cell::sync::OnceCell;
use scraper::{Html, Selector};

use super::{element_text, selector};
use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

struct Sel {
    container: Selector,
    table: Selector,
    row: Selector,
    th: Selector,
    td: Selector,
}

fn sel() -> &'static Sel {
    static SEL: OnceCell<Sel> = OnceCell::new();
    SEL.get_or_init(|| Sel {
        container: selector("div#priceList"),
        table: selector("table"),
        row: selector("tr"),
        th: selector("th"),
        td: selector("td"),
    })
}

pub fn parse(source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
    let s = sel();
    let doc = Html::parse_document(&raw.text());

    let table = doc
        .select(&s.container)
        .next()
        .ok_or_else(|| CrawlError::parse(source_key, "no div#priceList in document"))?
        .select(&s.table)
        .next()
        .ok_or_else(|| CrawlError::parse(source_key, "div#priceList has no table"))?;

    let mut rows = table.select(&s.row);
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| CrawlError::parse(source_key, "price table has no rows"))?
        .select(&s.th)
        .map(element_text)
        .collect();

    let mut out = Vec::new();
    for (i, tr) in rows.enumerate() {
        let cells: Vec<String> = tr.select(&s.td).map(element_text).collect();
        if cells.is_empty() {
            continue;
        }
        if cells.len() != header.len() {
            return Err(CrawlError::parse(
                source_key,
                format!(
                    "row {} has {} cells, header has {}",
                    i + 1,
                    cells.len(),
                    header.len()
                ),
            ));
        }
        out.push(
            header
                .iter()
                .zip(cells)
                .fold(NormalizedRecord::new(), |rec, (name, cell)| rec.with(name, cell)),
        );
    }
    Ok(out)
}
