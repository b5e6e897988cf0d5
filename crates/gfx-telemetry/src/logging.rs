//! Subscriber assembly: filter, console layer, file layer.
//!
//! ```text
//! registry ─┬─ console: fmt (plain | json) → stdout
//!           ├─ file:    fmt (plain | json) → non_blocking → <log_dir>/<log_file>
//!           └─ EnvFilter(log_level)
//! ```

use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::{TelemetryConfig, TelemetryError};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// Returns the file writer guard when file logging is enabled. Fails if a
/// global subscriber is already installed.
pub(crate) fn init_logging(config: &TelemetryConfig) -> Result<Option<WorkerGuard>, TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.console_output {
        layers.push(if config.json_logs {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer().with_target(true).with_ansi(true).boxed()
        });
    }

    let mut file_guard = None;
    if let Some(dir) = &config.log_dir {
        fs::create_dir_all(dir).map_err(|source| TelemetryError::LogDir {
            path: dir.clone(),
            source,
        })?;

        let appender = tracing_appender::rolling::never(dir, &config.log_file);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);

        layers.push(if config.json_logs {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(writer)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
                .boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    Ok(file_guard)
}
