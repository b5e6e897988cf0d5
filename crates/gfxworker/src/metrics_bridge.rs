//! Forwards server events to the Prometheus counters.

use gfx_comms::MetricsRecorder;
use gfx_telemetry::metrics::{
    CONNECTIONS_ACCEPTED, CONNECTIONS_REJECTED, ENDPOINT_FAILURES, IDLE_TIMEOUTS, REQUESTS,
    REQUEST_DURATION,
};
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusRecorder;

impl MetricsRecorder for PrometheusRecorder {
    fn record_connection_accepted(&self) {
        CONNECTIONS_ACCEPTED.inc();
    }

    fn record_connection_rejected(&self) {
        CONNECTIONS_REJECTED.inc();
    }

    fn record_request_completed(&self, duration: Duration, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        REQUESTS.with_label_values(&[outcome]).inc();
        REQUEST_DURATION.observe(duration.as_secs_f64());
    }

    fn record_endpoint_failure(&self) {
        ENDPOINT_FAILURES.inc();
    }

    fn record_idle_timeout(&self) {
        IDLE_TIMEOUTS.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_prometheus() {
        let recorder = PrometheusRecorder;
        let accepted = CONNECTIONS_ACCEPTED.get();
        let failures = REQUESTS.with_label_values(&["failure"]).get();
        let observed = REQUEST_DURATION.get_sample_count();

        recorder.record_connection_accepted();
        recorder.record_request_completed(Duration::from_millis(3), false);

        assert!(CONNECTIONS_ACCEPTED.get() >= accepted + 1.0);
        assert!(REQUESTS.with_label_values(&["failure"]).get() >= failures + 1.0);
        assert!(REQUEST_DURATION.get_sample_count() > observed);
    }
}
