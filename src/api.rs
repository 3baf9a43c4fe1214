// src/api.rs
use std::sync::Arc;

use serde_json::{json, Value};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::config::AddressLookup;
use crate::crawl::fetch::Fetcher;
use crate::crawl::registry::{
    Registry, SourceSpec, PHU_QUY_HISTORY, PNJ_HISTORY, WORLD_GOLD_PRICE_HIS,
};
use crate::crawl::types::{CrawlError, RecordBatch};
use crate::crawl::{crawl_all, crawl_descriptor};

pub const PNJ_HISTORY_LABEL: &str = "pnj_history";
pub const PHU_QUY_HISTORY_LABEL: &str = "phuquy_history";
pub const WORLD_HISTORY_LABEL: &str = "world_gold_price_history";

#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn Fetcher>,
    pub lookup: Arc<dyn AddressLookup>,
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(fetcher: Arc<dyn Fetcher>, lookup: Arc<dyn AddressLookup>) -> Self {
        Self {
            fetcher,
            lookup,
            registry: Arc::new(Registry::daily()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/crawl-all-daily", get(crawl_all_daily))
        .route("/crawl-pnj-history", get(crawl_pnj_history))
        .route("/crawl-phuquy-history", get(crawl_phuquy_history))
        .route("/goldprice-world/history", get(world_history))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Always 200; per-source failures are reported inside the body.
async fn crawl_all_daily(State(state): State<AppState>) -> Json<Value> {
    let report = crawl_all(
        state.fetcher.as_ref(),
        &state.registry,
        state.lookup.as_ref(),
    )
    .await;
    Json(report.to_json())
}

#[derive(serde::Serialize)]
struct HistoryResp {
    success: bool,
    total_rows: usize,
    data: RecordBatch,
}

struct ApiError(CrawlError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "history crawl failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl From<CrawlError> for ApiError {
    fn from(e: CrawlError) -> Self {
        Self(e)
    }
}

async fn crawl_history(
    state: &AppState,
    spec: &SourceSpec,
    params: &[(&str, &str)],
    label: &str,
) -> Result<Json<HistoryResp>, ApiError> {
    let mut source = spec.resolve(state.lookup.as_ref())?;
    if !params.is_empty() {
        source = source.with_query(params)?;
    }
    let data = crawl_descriptor(state.fetcher.as_ref(), &source, label).await?;
    tracing::info!(source = spec.key, rows = data.len(), "history crawled");
    Ok(Json(HistoryResp {
        success: true,
        total_rows: data.len(),
        data,
    }))
}

#[derive(serde::Deserialize)]
struct PnjHistoryQuery {
    day: String,
    month: String,
    year: String,
}

async fn crawl_pnj_history(
    State(state): State<AppState>,
    Query(q): Query<PnjHistoryQuery>,
) -> Result<Json<HistoryResp>, ApiError> {
    let params = [
        ("gold_history_day", q.day.as_str()),
        ("gold_history_month", q.month.as_str()),
        ("gold_history_year", q.year.as_str()),
    ];
    crawl_history(&state, &PNJ_HISTORY, &params, PNJ_HISTORY_LABEL).await
}

#[derive(serde::Deserialize)]
struct DateQuery {
    date: String,
}

async fn crawl_phuquy_history(
    State(state): State<AppState>,
    Query(q): Query<DateQuery>,
) -> Result<Json<HistoryResp>, ApiError> {
    let params = [("date", q.date.as_str())];
    crawl_history(&state, &PHU_QUY_HISTORY, &params, PHU_QUY_HISTORY_LABEL).await
}

async fn world_history(State(state): State<AppState>) -> Result<Json<HistoryResp>, ApiError> {
    crawl_history(&state, &WORLD_GOLD_PRICE_HIS, &[], WORLD_HISTORY_LABEL).await
}
