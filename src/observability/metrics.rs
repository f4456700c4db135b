//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_decisions_total` (counter): gated requests by decision
//! - `gate_request_duration_seconds` (histogram): time spent in the gate, by decision
//! - `gate_collaborator_errors_total` (counter): notes API failures by endpoint
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(decision: &'static str, start: Instant) {
    counter!("gate_decisions_total", "decision" => decision).increment(1);
    histogram!("gate_request_duration_seconds", "decision" => decision)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_collaborator_error(endpoint: &'static str) {
    counter!("gate_collaborator_errors_total", "endpoint" => endpoint).increment(1);
}
