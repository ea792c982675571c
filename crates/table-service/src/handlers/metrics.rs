//! Prometheus metrics endpoint handler.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus text format, e.g.
/// ```text
/// # TYPE ts_rolls_total counter
/// ts_rolls_total{mode="row",status="success"} 12
/// ```
#[tracing::instrument(skip_all, name = "ts.handlers.metrics")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
