//! Metrics collection and exposition.
//!
//! # Metrics
//! - `adapter_requests_total` (counter): requests by method, status, group
//! - `adapter_request_duration_seconds` (histogram): end-to-end latency
//! - `adapter_body_rejected_total` (counter): body preload failures by reason
//! - `adapter_relay_errors_total` (counter): relay failures by stage
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, group: &str, start: Instant) {
    counter!(
        "adapter_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "group" => group.to_string()
    )
    .increment(1);
    histogram!(
        "adapter_request_duration_seconds",
        "method" => method.to_string(),
        "group" => group.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_body_rejected(reason: &'static str) {
    counter!("adapter_body_rejected_total", "reason" => reason).increment(1);
}

pub fn record_relay_error(stage: &'static str) {
    counter!("adapter_relay_errors_total", "stage" => stage).increment(1);
}
