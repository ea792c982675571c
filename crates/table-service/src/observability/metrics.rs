//! Metrics definitions for the Table Service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ts_` prefix for Table Service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP verbs
//! - `endpoint`: parameterized paths, unknown paths collapse to `/other`
//! - `status`: success, error, timeout (or `invalid_state` etc. for rolls)
//! - `operation`: fixed per repository function
//! - `mode`: `row`, `column`, `invalid`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its handle for the
/// `/metrics` endpoint.
///
/// Must be called before any metric is recorded.
///
/// # Errors
///
/// Returns an error if bucket configuration is rejected or a recorder is
/// already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ts_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ts_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ts_http_requests_total`, `ts_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// Captures framework-level rejections (404, 405) as well as handler
/// responses because it runs as the outermost middleware.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ts_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ts_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Replaces table, column, row and session ids with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/table" | "/api/roll" | "/api/session" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();

    // parts[0] is the empty string before the leading slash.
    match parts.as_slice() {
        ["", "api", "table", _] => "/api/table/{id}".to_string(),
        ["", "api", "table", _, "tags"] => "/api/table/{id}/tags".to_string(),
        ["", "api", "table", _, "columns"] => "/api/table/{id}/columns".to_string(),
        ["", "api", "table", _, "columns", _] => "/api/table/{id}/columns/{column_id}".to_string(),
        ["", "api", "table", _, "rows"] => "/api/table/{id}/rows".to_string(),
        ["", "api", "table", _, "rows", _] => "/api/table/{id}/rows/{row_id}".to_string(),
        ["", "api", "session", _] => "/api/session/{id}".to_string(),
        ["", "api", "session", _, "rolls"] => "/api/session/{id}/rolls".to_string(),
        ["", "api", "session", _, "export"] => "/api/session/{id}/export".to_string(),
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `ts_db_query_duration_seconds`, `ts_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("ts_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ts_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Roll Metrics
// ============================================================================

/// Record a roll attempt
///
/// Metric: `ts_rolls_total`
/// Labels: `mode`, `status`
///
/// `mode` is normalized to `row`, `column` or `invalid` so arbitrary client
/// input never becomes a label value.
pub fn record_roll(mode: &str, status: &str) {
    let mode = if mode.eq_ignore_ascii_case("row") {
        "row"
    } else if mode.eq_ignore_ascii_case("column") {
        "column"
    } else {
        "invalid"
    };

    counter!("ts_rolls_total",
        "mode" => mode,
        "status" => status.to_string()
    )
    .increment(1);
}
