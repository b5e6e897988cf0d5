//! Telemetry configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Default log file name when only a directory is given.
pub const DEFAULT_LOG_FILE: &str = "gfxworker.log";

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive (trace, debug, info, warn, error, or per target)
    pub log_level: String,

    /// Whether to log to stdout
    pub console_output: bool,

    /// Whether to format lines as JSON
    pub json_logs: bool,

    /// Directory for the log file; no file logging when unset
    pub log_dir: Option<PathBuf>,

    /// File name inside `log_dir`
    pub log_file: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            log_dir: None,
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GFX_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `GFX_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `GFX_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `GFX_LOG_DIR`: Log directory (default: none)
    /// - `GFX_LOG_FILE`: Log file name (default: gfxworker.log)
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] over an arbitrary lookup.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            log_level: var("GFX_LOG_LEVEL")
                .or_else(|| var("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            console_output: var("GFX_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: var("GFX_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            log_dir: var("GFX_LOG_DIR").map(PathBuf::from),

            log_file: var("GFX_LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
        }
    }

    /// Full path of the log file, if file logging is enabled.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join(&self.log_file))
    }
}
