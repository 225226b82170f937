//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pipeline_requests_total` (counter): completed requests by method, outcome
//! - `pipeline_request_duration_seconds` (histogram): time from load to completion
//! - `pipeline_throttle_running` / `pipeline_throttle_pending` (gauges)
//! - `pipeline_reset_cancelled_total` (counter): tasks cancelled by resets, by stage
//! - `pipeline_resets_total` (counter): reset passes, by stage

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed request. `outcome` is `"ok"` or an error code.
pub fn record_request(method: &str, outcome: &str, start: Instant) {
    counter!(
        "pipeline_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("pipeline_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_throttle_occupancy(running: usize, pending: usize) {
    gauge!("pipeline_throttle_running").set(running as f64);
    gauge!("pipeline_throttle_pending").set(pending as f64);
}

/// Record one reset pass through `stage` that cancelled `cancelled` tasks.
pub fn record_reset(stage: &'static str, cancelled: usize) {
    counter!("pipeline_resets_total", "stage" => stage).increment(1);
    counter!("pipeline_reset_cancelled_total", "stage" => stage).increment(cancelled as u64);
}
