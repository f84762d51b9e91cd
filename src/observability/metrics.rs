//! Metrics collection and exposition.
//!
//! # Metrics
//! - `graceful_runs_total` (counter): finished runs by service, outcome
//! - `graceful_shutdown_duration_seconds` (histogram): time spent stopping a service
//! - `graceful_cleanup_panics_total` (counter): cleanups that panicked
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exposition is opt-in via `init_metrics`

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished run.
pub fn record_run(service: &str, outcome: &'static str) {
    metrics::counter!(
        "graceful_runs_total",
        "service" => service.to_owned(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a shutdown attempt.
pub fn record_shutdown(service: &str, elapsed: Duration, ok: bool) {
    metrics::histogram!(
        "graceful_shutdown_duration_seconds",
        "service" => service.to_owned(),
        "result" => if ok { "ok" } else { "error" }
    )
    .record(elapsed.as_secs_f64());
}

/// Record a panicking cleanup.
pub fn record_cleanup_panic() {
    metrics::counter!("graceful_cleanup_panics_total").increment(1);
}
