//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (requests, misses, failures, dropped log lines)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_requests_total` (counter): matched requests by verb, status
//! - `router_not_found_total` (counter): requests with no route
//! - `router_app_errors_total` (counter): handler failures by kind
//! - `router_error_log_dropped_total` (counter): error lines lost to a full queue
//!
//! # Design Decisions
//! - Low-overhead metric updates (no-ops until a recorder is installed)
//! - Labels limited to verb, status and failure kind

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::observability::error_log::ErrorKind;

/// Count a request that reached a handler.
pub fn record_request(verb: &str, status: u16) {
    metrics::counter!(
        "router_requests_total",
        "verb" => verb.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Count a request with no matching route.
pub fn record_not_found() {
    metrics::counter!("router_not_found_total").increment(1);
}

/// Count a handler failure by its class.
pub fn record_app_error(kind: ErrorKind) {
    metrics::counter!("router_app_errors_total", "kind" => kind.as_str()).increment(1);
}

/// Count an error log record evicted from the queue.
pub fn record_log_dropped() {
    metrics::counter!("router_error_log_dropped_total").increment(1);
}

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
