//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by routing outcome
//! - `router_match_duration_seconds` (histogram): time spent matching
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no-ops until a recorder exists
//! - Prometheus exporter installed only when enabled in configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one routing decision.
pub fn record_match(outcome: &'static str, started: Instant) {
    metrics::counter!("router_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("router_match_duration_seconds").record(started.elapsed().as_secs_f64());
}
