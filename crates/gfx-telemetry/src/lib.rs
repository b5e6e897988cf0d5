//! # GFX Telemetry
//!
//! Logging and metrics bootstrap for the GFX worker process.
//!
//! ## Components
//!
//! - **Logging**: `tracing` subscriber with an `EnvFilter`, console output
//!   (plain or JSON) and an optional non-blocking log file
//! - **Metrics**: Prometheus counters for connections and requests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gfx_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//!
//!     // Log lines reach the file until the guard is dropped.
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GFX_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directive |
//! | `GFX_CONSOLE_OUTPUT` | `true` | Log to stdout |
//! | `GFX_JSON_LOGS` | `false` | JSON formatted lines |
//! | `GFX_LOG_DIR` | unset | Directory for the log file |
//! | `GFX_LOG_FILE` | `gfxworker.log` | Log file name inside `GFX_LOG_DIR` |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, register_metrics};

use std::path::PathBuf;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Cannot prepare log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Install the global subscriber and register metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
/// Dropping it flushes the log file.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    let file_guard = logging::init_logging(&config)?;

    tracing::info!(
        log_level = %config.log_level,
        json = config.json_logs,
        log_file = ?config.log_path(),
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        _file: file_guard,
    })
}

/// Keeps the log file writer alive. Drop to flush.
pub struct TelemetryGuard {
    _file: Option<WorkerGuard>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!("Shutting down telemetry");
    }
}
