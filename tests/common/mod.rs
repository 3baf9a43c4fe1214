// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;

use gold_price_crawler::crawl::fetch::StubFetcher;
use gold_price_crawler::RawResponse;

pub fn fixture(name: &str) -> RawResponse {
    let path = format!("tests/fixtures/{name}");
    let body = fs::read(&path).unwrap_or_else(|e| panic!("missing {path}: {e}"));
    RawResponse::ok(body)
}

pub fn stub_url(key: &str) -> String {
    format!("http://stub.test/{}", key.to_lowercase())
}

/// Every daily key pointed at the stub host.
pub fn stub_lookup() -> BTreeMap<String, String> {
    [
        "BTMC_DAILY",
        "SJC_DAILY",
        "PNJ_DAILY",
        "DOJI_DAILY",
        "PHU_QUY_DAILY",
        "WORLD_GOLD_PRICE",
    ]
    .into_iter()
    .map(|k| (k.to_string(), stub_url(k)))
    .collect()
}

/// Canned upstream responses for the whole daily registry.
pub fn daily_stub() -> StubFetcher {
    StubFetcher::new()
        .route(&stub_url("BTMC_DAILY"), fixture("btmc.json"))
        .route(&stub_url("SJC_DAILY"), fixture("sjc.json"))
        .route(&stub_url("PNJ_DAILY"), fixture("pnj.html"))
        .route(&stub_url("DOJI_DAILY"), fixture("doji.xml"))
        .route(&stub_url("PHU_QUY_DAILY"), fixture("phuquy.html"))
        .route(&stub_url("WORLD_GOLD_PRICE"), fixture("world.json"))
}
