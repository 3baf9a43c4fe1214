// src/metrics.rs
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shuttle_axum::axum::{routing::get, Router};

/// Process-wide Prometheus recorder backing `GET /metrics`.
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder and publish how many daily sources are registered.
    /// Call once per process; a second install fails.
    pub fn init(daily_sources: usize) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        gauge!("crawl_registered_sources").set(daily_sources as f64);

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus text exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
