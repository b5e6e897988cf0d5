//! Instrumentation hooks for the listening server and its workers.
//!
//! ## Usage
//!
//! ```ignore
//! use gfx_comms::metrics::Metrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(Metrics::new());
//! let server = ListeningServer::new(config, unit)?.with_metrics(metrics.clone());
//! server.run().await?;
//!
//! println!("{:?}", metrics.snapshot());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// In-process counters for the server.
#[derive(Default)]
pub struct Metrics {
    /// Connections admitted into the work queue
    pub connections_accepted: AtomicU64,
    /// Connections closed unprocessed because the queue was full
    pub connections_rejected: AtomicU64,
    /// Requests answered with a success response
    pub requests_succeeded: AtomicU64,
    /// Requests answered with a failure response
    pub requests_failed: AtomicU64,
    /// Reads or writes that failed or timed out
    pub endpoint_failures: AtomicU64,
    /// Accept waits that ended on the idle timeout
    pub idle_timeouts: AtomicU64,
    /// Cumulative request time in nanoseconds
    pub request_time_ns: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one request that produced a response.
    ///
    /// # Arguments
    /// * `duration` - Time from dequeue to response written
    /// * `success` - Whether the processing unit succeeded
    pub fn record_request_completed(&self, duration: Duration, success: bool) {
        if success {
            self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.request_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_endpoint_failure(&self) {
        self.endpoint_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_timeout(&self) {
        self.idle_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Average time per completed request, in nanoseconds.
    pub fn avg_request_time_ns(&self) -> u64 {
        let total = self.request_time_ns.load(Ordering::Relaxed);
        let count = self.requests_succeeded.load(Ordering::Relaxed)
            + self.requests_failed.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            endpoint_failures: self.endpoint_failures.load(Ordering::Relaxed),
            idle_timeouts: self.idle_timeouts.load(Ordering::Relaxed),
            avg_request_ns: self.avg_request_time_ns(),
        }
    }
}

/// Point-in-time copy of [`Metrics`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_accepted: u64,
    pub connections_rejected: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub endpoint_failures: u64,
    pub idle_timeouts: u64,
    pub avg_request_ns: u64,
}

/// Sink for server events.
///
/// Implement this to forward events to an external metrics system.
pub trait MetricsRecorder: Send + Sync {
    fn record_connection_accepted(&self);

    fn record_connection_rejected(&self);

    fn record_request_completed(&self, duration: Duration, success: bool);

    fn record_endpoint_failure(&self);

    fn record_idle_timeout(&self);
}

/// Discards everything.
#[derive(Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_connection_accepted(&self) {}
    fn record_connection_rejected(&self) {}
    fn record_request_completed(&self, _: Duration, _: bool) {}
    fn record_endpoint_failure(&self) {}
    fn record_idle_timeout(&self) {}
}

impl MetricsRecorder for Metrics {
    fn record_connection_accepted(&self) {
        Metrics::record_connection_accepted(self);
    }

    fn record_connection_rejected(&self) {
        Metrics::record_connection_rejected(self);
    }

    fn record_request_completed(&self, duration: Duration, success: bool) {
        Metrics::record_request_completed(self, duration, success);
    }

    fn record_endpoint_failure(&self) {
        Metrics::record_endpoint_failure(self);
    }

    fn record_idle_timeout(&self) {
        Metrics::record_idle_timeout(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_start_at_zero() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_request_outcomes_and_average() {
        let metrics = Metrics::new();

        metrics.record_request_completed(Duration::from_nanos(100), true);
        metrics.record_request_completed(Duration::from_nanos(300), false);
        metrics.record_request_completed(Duration::from_nanos(200), true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_succeeded, 2);
        assert_eq!(snapshot.requests_failed, 1);
        assert_eq!(snapshot.avg_request_ns, 200);
    }

    #[test]
    fn test_connection_counters() {
        let metrics = Metrics::new();
        let recorder: &dyn MetricsRecorder = &metrics;

        recorder.record_connection_accepted();
        recorder.record_connection_accepted();
        recorder.record_connection_rejected();
        recorder.record_endpoint_failure();
        recorder.record_idle_timeout();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_accepted, 2);
        assert_eq!(snapshot.connections_rejected, 1);
        assert_eq!(snapshot.endpoint_failures, 1);
        assert_eq!(snapshot.idle_timeouts, 1);
    }

    #[test]
    fn test_noop_metrics() {
        let metrics = NoOpMetrics;
        metrics.record_connection_accepted();
        metrics.record_connection_rejected();
        metrics.record_request_completed(Duration::from_millis(1), true);
        metrics.record_endpoint_failure();
        metrics.record_idle_timeout();
    }
}
