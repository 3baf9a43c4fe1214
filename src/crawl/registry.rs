// src/crawl/registry.rs
use crate::config::{resolve_address, AddressLookup};
use crate::crawl::types::CrawlError;

/// Closed set of source formats; each maps to one module under `providers/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// JSON list under `DataList.Data`, keys like `@n_1`.
    AggregatorJson,
    /// JSON list of flat objects.
    FlatJson,
    /// First HTML table, 5/4-cell rows.
    RetailTable,
    /// Table inside `div#priceList`.
    PriceListTable,
    /// Multi-table history page with category carry-forward.
    HistoryTables,
    /// XML with `DGPlist` / `JewelryList` sections.
    SectionXml,
    /// International spot snapshot (`ts` + `items`).
    SpotSnapshot,
    /// International packed `timestamp,price` stream.
    SpotHistory,
}

#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    pub key: &'static str,
    pub kind: SourceKind,
    pub default_url: Option<&'static str>,
}

impl SourceSpec {
    /// Resolves the address now; callers resolve once per cycle.
    pub fn resolve(&self, lookup: &dyn AddressLookup) -> Result<SourceDescriptor, CrawlError> {
        let url = resolve_address(self.key, self.default_url, lookup)?;
        Ok(SourceDescriptor {
            key: self.key.to_string(),
            url,
            kind: self.kind,
        })
    }
}

/// A source with its address resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub key: String,
    pub url: String,
    pub kind: SourceKind,
}

impl SourceDescriptor {
    /// Lower-cased key, as stamped into each record's `source` field.
    pub fn label(&self) -> String {
        self.key.to_lowercase()
    }

    /// Appends query parameters to the resolved address.
    pub fn with_query(mut self, params: &[(&str, &str)]) -> Result<Self, CrawlError> {
        let url = reqwest::Url::parse_with_params(&self.url, params).map_err(|e| {
            CrawlError::Configuration {
                key: self.key.clone(),
                cause: format!("address {:?} is not a url: {e}", self.url),
            }
        })?;
        self.url = url.to_string();
        Ok(self)
    }
}

pub const BTMC_DAILY: SourceSpec = SourceSpec {
    key: "BTMC_DAILY",
    kind: SourceKind::AggregatorJson,
    default_url: None,
};
pub const SJC_DAILY: SourceSpec = SourceSpec {
    key: "SJC_DAILY",
    kind: SourceKind::FlatJson,
    default_url: None,
};
pub const PNJ_DAILY: SourceSpec = SourceSpec {
    key: "PNJ_DAILY",
    kind: SourceKind::RetailTable,
    default_url: Some("https://giavang.pnj.com.vn/"),
};
pub const DOJI_DAILY: SourceSpec = SourceSpec {
    key: "DOJI_DAILY",
    kind: SourceKind::SectionXml,
    default_url: None,
};
pub const PHU_QUY_DAILY: SourceSpec = SourceSpec {
    key: "PHU_QUY_DAILY",
    kind: SourceKind::PriceListTable,
    default_url: None,
};
pub const WORLD_GOLD_PRICE: SourceSpec = SourceSpec {
    key: "WORLD_GOLD_PRICE",
    kind: SourceKind::SpotSnapshot,
    default_url: Some("https://data-asg.goldprice.org/dbXRates/USD"),
};

pub const PNJ_HISTORY: SourceSpec = SourceSpec {
    key: "PNJ_HISTORY",
    kind: SourceKind::HistoryTables,
    default_url: Some("https://giavang.pnj.com.vn/history"),
};
pub const PHU_QUY_HISTORY: SourceSpec = SourceSpec {
    key: "PHU_QUY_HISTORY",
    kind: SourceKind::PriceListTable,
    default_url: Some("https://phuquygroup.vn/Gold/GoldPriceLast"),
};
pub const WORLD_GOLD_PRICE_HIS: SourceSpec = SourceSpec {
    key: "WORLD_GOLD_PRICE_HIS",
    kind: SourceKind::SpotHistory,
    default_url: Some("https://data-asg.goldprice.org/GetDataHistorical/USD-XAU/0"),
};

/// Ordered, read-only list of sources crawled together.
#[derive(Debug, Clone)]
pub struct Registry {
    specs: Vec<SourceSpec>,
}

impl Registry {
    pub fn new(specs: Vec<SourceSpec>) -> Self {
        Self { specs }
    }

    /// Sources behind `/crawl-all-daily` and the batch bin.
    pub fn daily() -> Self {
        Self::new(vec![
            BTMC_DAILY,
            SJC_DAILY,
            PNJ_DAILY,
            DOJI_DAILY,
            PHU_QUY_DAILY,
            WORLD_GOLD_PRICE,
        ])
    }

    pub fn specs(&self) -> &[SourceSpec] {
        &self.specs
    }

    pub fn get(&self, key: &str) -> Option<&SourceSpec> {
        self.specs.iter().find(|s| s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn daily_registry_order_is_stable() {
        let keys: Vec<&str> = Registry::daily().specs().iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec![
                "BTMC_DAILY",
                "SJC_DAILY",
                "PNJ_DAILY",
                "DOJI_DAILY",
                "PHU_QUY_DAILY",
                "WORLD_GOLD_PRICE"
            ]
        );
    }

    #[test]
    fn resolve_uses_lookup_then_default() {
        let mut t = BTreeMap::new();
        t.insert("SJC_DAILY".to_string(), "http://sjc.test".to_string());

        let d = SJC_DAILY.resolve(&t).unwrap();
        assert_eq!(d.url, "http://sjc.test");
        assert_eq!(d.label(), "sjc_daily");

        let d = PNJ_DAILY.resolve(&t).unwrap();
        assert_eq!(d.url, "https://giavang.pnj.com.vn/");

        // no override and no default: the key is the literal address
        let d = DOJI_DAILY.resolve(&t).unwrap();
        assert_eq!(d.url, "DOJI_DAILY");
    }

    #[test]
    fn with_query_appends_params_and_rejects_non_urls() {
        let t = BTreeMap::new();
        let d = PHU_QUY_HISTORY
            .resolve(&t)
            .unwrap()
            .with_query(&[("date", "14/10/2026")])
            .unwrap();
        assert_eq!(
            d.url,
            "https://phuquygroup.vn/Gold/GoldPriceLast?date=14%2F10%2F2026"
        );

        let err = DOJI_DAILY.resolve(&t).unwrap().with_query(&[]).unwrap_err();
        assert!(matches!(err, CrawlError::Configuration { .. }));
    }
}
