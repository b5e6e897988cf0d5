//! Prometheus metrics for the GFX worker.
//!
//! All metrics follow the naming convention: `gfx_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Process-wide metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Connections admitted into the work queue
    pub static ref CONNECTIONS_ACCEPTED: Counter = Counter::new(
        "gfx_connections_accepted_total",
        "Connections admitted for processing"
    ).expect("metric creation failed");

    /// Connections dropped because the worker pool and queue were full
    pub static ref CONNECTIONS_REJECTED: Counter = Counter::new(
        "gfx_connections_rejected_total",
        "Connections closed unprocessed because the queue was full"
    ).expect("metric creation failed");

    /// Requests by outcome
    pub static ref REQUESTS: CounterVec = CounterVec::new(
        Opts::new("gfx_requests_total", "Requests answered by the worker"),
        &["outcome"]  // success / failure
    ).expect("metric creation failed");

    /// Time from dequeue to response written
    pub static ref REQUEST_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "gfx_request_duration_seconds",
            "Time spent serving one request"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Failed or timed out endpoint reads and writes
    pub static ref ENDPOINT_FAILURES: Counter = Counter::new(
        "gfx_endpoint_failures_total",
        "Endpoint reads or writes that failed or timed out"
    ).expect("metric creation failed");

    /// Accept waits that hit the idle timeout
    pub static ref IDLE_TIMEOUTS: Counter = Counter::new(
        "gfx_idle_timeouts_total",
        "Accept waits that ended on the idle timeout"
    ).expect("metric creation failed");
}

/// Register all metrics with [`REGISTRY`]. Calling it again is a no-op.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CONNECTIONS_ACCEPTED.clone()),
        Box::new(CONNECTIONS_REJECTED.clone()),
        Box::new(REQUESTS.clone()),
        Box::new(REQUEST_DURATION.clone()),
        Box::new(ENDPOINT_FAILURES.clone()),
        Box::new(IDLE_TIMEOUTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
