//! Metrics definitions for the scholarship service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `sc_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `endpoint`: UUID and numeric path segments are replaced by placeholders
//! - `status`: success, error, timeout
//! - `operation`: bounded by code
//! - `outcome`: bounded by code

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use uuid::Uuid;

/// Initialize the Prometheus recorder and return the handle used by
/// `GET /metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("sc_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.300, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("sc_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("sc_file_upload_bytes".to_string()),
            &[
                16_384.0,
                65_536.0,
                262_144.0,
                1_048_576.0,
                4_194_304.0,
                10_485_760.0,
                52_428_800.0,
            ],
        )
        .map_err(|e| format!("Failed to set upload size buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `sc_http_requests_total`, `sc_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`/`status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(path);
    let status = categorize_status_code(status_code);

    histogram!("sc_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("sc_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize a request path to a bounded label.
///
/// UUID segments become `{id}` and numeric segments become `{number}`.
/// Paths outside `/api/v1` and the operational endpoints collapse to `/other`.
pub fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/ready" | "/metrics" => return path.to_string(),
        _ => {}
    }

    if !path.starts_with("/api/v1/") {
        return "/other".to_string();
    }

    path.split('/')
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                "{number}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record a database query.
///
/// Metric: `sc_db_queries_total`, `sc_db_query_duration_seconds`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("sc_db_query_duration_seconds",
        "operation" => operation,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("sc_db_queries_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

// ============================================================================
// Domain Metrics
// ============================================================================

/// Record a login attempt.
///
/// Metric: `sc_logins_total`
/// Labels: `outcome` (success, invalid_credentials, inactive, error)
pub fn record_login(outcome: &'static str) {
    counter!("sc_logins_total", "outcome" => outcome).increment(1);
}

/// Record a booking or cancellation attempt.
///
/// Metric: `sc_slot_bookings_total`
/// Labels: `action` (book, cancel), `outcome`
pub fn record_slot_booking(action: &'static str, outcome: &'static str) {
    counter!("sc_slot_bookings_total",
        "action" => action,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a document upload.
///
/// Metric: `sc_file_uploads_total`, `sc_file_upload_bytes`
/// Labels: `outcome`
pub fn record_file_upload(outcome: &'static str, size_bytes: usize) {
    counter!("sc_file_uploads_total", "outcome" => outcome).increment(1);
    if outcome == "success" {
        histogram!("sc_file_upload_bytes").record(size_bytes as f64);
    }
}
