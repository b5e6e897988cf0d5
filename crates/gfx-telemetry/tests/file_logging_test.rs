//! Installs the global subscriber, so it lives in its own test binary.

use gfx_telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use std::fs;

#[test]
fn test_json_lines_reach_log_file() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");
    let config = TelemetryConfig {
        log_level: "debug".to_string(),
        console_output: false,
        json_logs: true,
        log_dir: Some(log_dir.clone()),
        log_file: "worker.log".to_string(),
    };

    // Act
    let guard = init_telemetry(config.clone()).unwrap();
    tracing::info!(request = "hello", "served request");
    tracing::trace!("filtered out");
    drop(guard);

    // Assert
    let contents = fs::read_to_string(log_dir.join("worker.log")).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let served = lines
        .iter()
        .find(|line| line["fields"]["message"] == "served request")
        .expect("log line missing");
    assert_eq!(served["level"], "INFO");
    assert_eq!(served["fields"]["request"], "hello");
    assert!(!contents.contains("filtered out"));

    // A second global subscriber is refused.
    let again = init_telemetry(TelemetryConfig {
        console_output: false,
        ..TelemetryConfig::default()
    });
    assert!(matches!(again, Err(TelemetryError::LoggingInit(_))));
}
