//! Metrics collection and exposition.
//!
//! # Metrics
//! - `carbon_http_requests_total` (counter): requests by endpoint, status
//! - `carbon_http_request_duration_seconds` (histogram): handler latency by endpoint
//! - `carbon_ledger_calls_total` (counter): ledger calls by operation, outcome
//! - `carbon_ledger_call_duration_seconds` (histogram): ledger latency by operation
//! - `carbon_ledger_healthy` (gauge): 1=reachable, 0=unreachable, by network
//! - `carbon_submissions_total` (counter): submissions by result
//!
//! Recording is a no-op until a recorder is installed.

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    counter!(
        "carbon_http_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("carbon_http_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_ledger_call(operation: &'static str, outcome: &'static str, start: Instant) {
    counter!(
        "carbon_ledger_calls_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("carbon_ledger_call_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_ledger_health(network: &'static str, healthy: bool) {
    gauge!("carbon_ledger_healthy", "network" => network).set(if healthy { 1.0 } else { 0.0 });
}

/// `result` is `accepted`, a ledger result code, or a failure class.
pub fn record_submission(result: &str, start: Instant) {
    counter!("carbon_submissions_total", "result" => result.to_string()).increment(1);
    tracing::trace!(elapsed_ms = start.elapsed().as_millis() as u64, "Submission recorded");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        let start = Instant::now();
        record_request("build", 200, start);
        record_ledger_call("load_account", "ok", start);
        record_ledger_health("testnet", false);
        record_submission("accepted", start);
    }
}
