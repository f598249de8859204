//! Metrics collection and exposition.
//!
//! # Metrics
//! - `visitor_filter_requests_total` (counter): requests by verdict
//! - `visitor_filter_reports_total` (counter): reports by outcome
//!   (`sent`, `failed`, `dropped`)
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one classified request.
pub fn record_verdict(verdict: &'static str) {
    metrics::counter!("visitor_filter_requests_total", "verdict" => verdict).increment(1);
}

/// Count one report outcome.
pub fn record_report(outcome: &'static str) {
    metrics::counter!("visitor_filter_reports_total", "outcome" => outcome).increment(1);
}
