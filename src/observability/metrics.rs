//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pipeline_requests_total` (counter): requests by method, status
//! - `pipeline_request_duration_seconds` (histogram): latency by method
//! - `pipeline_fatal_failures_total` (counter): fatal failures by stage
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Histogram buckets tuned for typical web latencies

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "pipeline_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "pipeline_request_duration_seconds";
pub const FATAL_FAILURES_TOTAL: &str = "pipeline_fatal_failures_total";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install()?;

    describe_counter!(REQUESTS_TOTAL, "Requests answered, by method and status");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time from request receipt to response transmission"
    );
    describe_counter!(FATAL_FAILURES_TOTAL, "Unrecoverable pipeline failures, by stage");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one answered request.
pub fn record_request(method: &Method, status: u16, started: Instant) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// Record a fatal failure at `stage`.
pub fn record_fatal(stage: &str) {
    counter!(FATAL_FAILURES_TOTAL, "stage" => stage.to_string()).increment(1);
}
