// src/crawl/providers/history_tables.rs
//! Historical price page: one table per region, a current-price snapshot first.
//!
//! Category cells span rows, so a region's body looks like
//!
//! ```text
//! | Vàng SJC | 75.000 | 76.000 | 01/01/2024 09:00:00 |
//! |            74.000 | 75.500 | 01/01/2024 10:00:00 |
//! ```
//!
//! and the 3-cell continuation rows inherit the last category seen.

use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use scraper::{ElementRef, Html, Selector};

use super::{element_text, selector};
use crate::crawl::types::{CrawlError, NormalizedRecord, RawResponse, RecordBatch};

pub const UPDATED_AT_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const HEADER_LABEL: &str = "loại vàng";

struct Sel {
    table: Selector,
    title: Selector,
    body_row: Selector,
    td: Selector,
}

fn sel() -> &'static Sel {
    static SEL: OnceCell<Sel> = OnceCell::new();
    SEL.get_or_init(|| Sel {
        table: selector("table"),
        title: selector("thead th"),
        body_row: selector("tbody tr"),
        td: selector("td"),
    })
}

/// `[category, buy, sell, updated_at]`, still as page text.
type HistoryRow = [String; 4];

fn body_rows(table: ElementRef<'_>) -> Vec<HistoryRow> {
    let s = sel();
    let mut out: Vec<HistoryRow> = Vec::new();
    let mut category: Option<String> = None;

    for tr in table.select(&s.body_row) {
        let mut cells: Vec<String> = tr.select(&s.td).map(element_text).collect();
        match cells.len() {
            4 => category = Some(cells[0].clone()),
            3 => match &category {
                Some(c) => cells.insert(0, c.clone()),
                None => continue,
            },
            _ => continue,
        }
        if let Ok(row) = cells.try_into() {
            out.push(row);
        }
    }

    if out
        .first()
        .is_some_and(|r| r[0].to_lowercase() == HEADER_LABEL)
    {
        out.remove(0);
    }
    out
}

/// `"75.000"` -> `75000`.
pub fn parse_price(source_key: &str, s: &str) -> Result<i64, CrawlError> {
    s.trim()
        .replace('.', "")
        .parse::<i64>()
        .map_err(|e| CrawlError::parse(source_key, format!("bad price {s:?}: {e}")))
}

pub fn parse_updated_at(source_key: &str, s: &str) -> Result<NaiveDateTime, CrawlError> {
    NaiveDateTime::parse_from_str(s.trim(), UPDATED_AT_FORMAT)
        .map_err(|e| CrawlError::parse(source_key, format!("bad update time {s:?}: {e}")))
}

pub fn parse(source_key: &str, raw: &RawResponse) -> Result<RecordBatch, CrawlError> {
    let s = sel();
    let doc = Html::parse_document(&raw.text());

    let mut out = Vec::new();
    for (i, table) in doc.select(&s.table).enumerate().skip(1) {
        let region = table
            .select(&s.title)
            .next()
            .map(element_text)
            .unwrap_or_else(|| format!("Unknown_{i}"));

        for [category, buy, sell, updated_at] in body_rows(table) {
            let updated_at = parse_updated_at(source_key, &updated_at)?;
            out.push(
                NormalizedRecord::new()
                    .with("loai_vang", category)
                    .with("gia_mua", parse_price(source_key, &buy)?)
                    .with("gia_ban", parse_price(source_key, &sell)?)
                    .with(
                        "thoi_gian_cap_nhat",
                        updated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    )
                    .with("region", region.clone()),
            );
        }
    }

    if out.is_empty() {
        return Err(CrawlError::parse(source_key, "no history tables with data"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(tables: &str) -> String {
        format!(
            "<html><body>\
             <table><tbody><tr><td>snapshot</td><td>1</td><td>2</td><td>01/01/2024 08:00:00</td></tr></tbody></table>\
             {tables}</body></html>"
        )
    }

    #[test]
    fn continuation_rows_inherit_category() {
        let html = page(
            "<table><thead><tr><th>TPHCM</th></tr></thead><tbody>\
             <tr><td>Vàng SJC</td><td>75.000</td><td>76.000</td><td>01/01/2024 09:00:00</td></tr>\
             <tr><td>74.000</td><td>75.500</td><td>01/01/2024 10:00:00</td></tr>\
             </tbody></table>",
        );
        let out = parse("PNJ_HISTORY", &RawResponse::ok(html)).unwrap();
        assert_eq!(out.len(), 2);

        assert_eq!(out[0].get("loai_vang"), Some(&json!("Vàng SJC")));
        assert_eq!(out[0].get("gia_mua"), Some(&json!(75000)));
        assert_eq!(out[0].get("gia_ban"), Some(&json!(76000)));

        assert_eq!(out[1].get("loai_vang"), Some(&json!("Vàng SJC")));
        assert_eq!(out[1].get("gia_mua"), Some(&json!(74000)));
        assert_eq!(out[1].get("gia_ban"), Some(&json!(75500)));
        assert_eq!(
            out[1].get("thoi_gian_cap_nhat"),
            Some(&json!("2024-01-01T10:00:00"))
        );
        assert_eq!(out[1].get("region"), Some(&json!("TPHCM")));
    }

    #[test]
    fn header_row_is_dropped_and_orphans_skipped() {
        let html = page(
            "<table><tbody>\
             <tr><td>74.000</td><td>75.500</td><td>01/01/2024 10:00:00</td></tr>\
             <tr><td>Loại vàng</td><td>Giá mua</td><td>Giá bán</td><td>Thời gian cập nhật</td></tr>\
             <tr><td>Nhẫn 24K</td><td>63.100</td><td>64.200</td><td>02/01/2024 11:15:00</td></tr>\
             </tbody></table>",
        );
        let out = parse("PNJ_HISTORY", &RawResponse::ok(html)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("loai_vang"), Some(&json!("Nhẫn 24K")));
        assert_eq!(out[0].get("region"), Some(&json!("Unknown_1")));
    }

    #[test]
    fn tables_are_concatenated_in_page_order() {
        let html = page(
            "<table><thead><tr><th>Hà Nội</th></tr></thead><tbody>\
             <tr><td>PNJ</td><td>1.000</td><td>2.000</td><td>01/01/2024 09:00:00</td></tr></tbody></table>\
             <table><thead><tr><th>Đà Nẵng</th></tr></thead><tbody>\
             <tr><td>PNJ</td><td>3.000</td><td>4.000</td><td>01/01/2024 09:00:00</td></tr></tbody></table>",
        );
        let out = parse("PNJ_HISTORY", &RawResponse::ok(html)).unwrap();
        let regions: Vec<_> = out.iter().map(|r| r.get("region").cloned()).collect();
        assert_eq!(regions, vec![Some(json!("Hà Nội")), Some(json!("Đà Nẵng"))]);
    }

    #[test]
    fn only_snapshot_table_fails() {
        let err = parse("PNJ_HISTORY", &RawResponse::ok(page(""))).unwrap_err();
        assert!(err.to_string().contains("no history tables"));
    }

    #[test]
    fn malformed_price_or_time_fails() {
        let bad_price = page(
            "<table><tbody><tr><td>SJC</td><td>n/a</td><td>76.000</td><td>01/01/2024 09:00:00</td></tr></tbody></table>",
        );
        assert!(parse("PNJ_HISTORY", &RawResponse::ok(bad_price)).is_err());

        let bad_time = page(
            "<table><tbody><tr><td>SJC</td><td>75.000</td><td>76.000</td><td>2024-01-01 09:00</td></tr></tbody></table>",
        );
        let err = parse("PNJ_HISTORY", &RawResponse::ok(bad_time)).unwrap_err();
        assert!(err.to_string().contains("bad update time"));
    }
}
