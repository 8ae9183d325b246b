//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_registrations_total` (counter): registrations by outcome
//! - `gateway_quota_charges_total` (counter): quota settlements by outcome
//! - `gateway_recharges_total` (counter) / `gateway_recharged_requests_total` (counter)
//! - `gateway_identities` (gauge): records held by the identity store

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_registration(outcome: &'static str) {
    counter!("gateway_registrations_total", "outcome" => outcome).increment(1);
}

pub fn record_quota_charge(outcome: &'static str) {
    counter!("gateway_quota_charges_total", "outcome" => outcome).increment(1);
}

pub fn record_recharge(amount: u64) {
    counter!("gateway_recharges_total").increment(1);
    counter!("gateway_recharged_requests_total").increment(amount);
}

pub fn record_identities(count: usize) {
    gauge!("gateway_identities").set(count as f64);
}
