use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the scrape series.
    /// Only the binary calls this; without a recorder the macros are no-ops.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("scrape_requests_total", "Page fetches attempted, by source.");
        describe_counter!(
            "scrape_failures_total",
            "Page fetches that ended in a failure outcome, by source."
        );
        describe_histogram!("scrape_fetch_ms", "Page fetch latency in milliseconds.");
        describe_counter!(
            "aggregate_requests_total",
            "Comprehensive requests, by asset type."
        );

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
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
