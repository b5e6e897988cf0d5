//! Command line surface.

use clap::Parser;
use gfx_comms::{ConfigError, ServerConfig, ServerConfigBuilder, TimeoutMs};
use gfx_telemetry::TelemetryConfig;
use std::path::PathBuf;

/// GFX processing server
#[derive(Parser, Debug, Clone)]
#[command(name = "gfxworker")]
#[command(about = "GFX processing server")]
pub struct Args {
    /// Keep alive in seconds without receiving any requests, 0 is infinite
    #[arg(short = 'l', long = "keep-alive", default_value_t = 60)]
    pub keep_alive_secs: u32,

    /// Request processing thread pool size, minimum 1
    #[arg(short = 't', long = "threads", default_value_t = 5)]
    pub threads: usize,

    /// Capacity for pending requests when all threads in the pool are busy,
    /// minimum 1
    #[arg(short = 'q', long = "queue-size", default_value_t = 10)]
    pub queue_size: usize,

    /// Pipe name
    #[arg(short = 'n', long = "pipe-name", default_value = "gfxworker")]
    pub pipe_name: String,

    /// Log directory
    #[arg(short = 'd', long = "log-dir", default_value = ".")]
    pub log_dir: PathBuf,

    /// Log file name (default: gfxworker.<pipe-name>.log)
    #[arg(short = 'f', long = "log-file")]
    pub log_file: Option<String>,
}

impl Args {
    /// Server settings. Pool and queue sizes below 1 are raised to 1.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        ServerConfigBuilder::new(self.pipe_name.as_str())
            .idle_timeout(TimeoutMs::from_secs_or_forever(self.keep_alive_secs))
            .worker_threads(self.threads.max(1))
            .queue_capacity(self.queue_size.max(1))
            .build()
    }

    pub fn log_file_name(&self) -> String {
        self.log_file
            .clone()
            .unwrap_or_else(|| format!("gfxworker.{}.log", self.pipe_name))
    }

    /// Overlay the log file location onto `base`.
    pub fn telemetry_config(&self, base: TelemetryConfig) -> TelemetryConfig {
        TelemetryConfig {
            log_dir: Some(self.log_dir.clone()),
            log_file: self.log_file_name(),
            ..base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("gfxworker").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.keep_alive_secs, 60);
        assert_eq!(args.threads, 5);
        assert_eq!(args.queue_size, 10);
        assert_eq!(args.pipe_name, "gfxworker");
        assert_eq!(args.log_dir, PathBuf::from("."));
        assert_eq!(args.log_file_name(), "gfxworker.gfxworker.log");

        let config = args.server_config().unwrap();
        assert_eq!(config.idle_timeout, TimeoutMs::new(60_000));
        assert_eq!(config.admission_limit(), 15);
    }

    #[test]
    fn test_short_flags() {
        let args = parse(&["-l", "0", "-t", "2", "-q", "3", "-n", "thumbs", "-d", "/tmp", "-f", "w.log"]);

        let config = args.server_config().unwrap();
        assert!(config.idle_timeout.is_forever());
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.queue_capacity, 3);
        assert_eq!(config.channel_name.as_str(), "thumbs");

        let telemetry = args.telemetry_config(TelemetryConfig::default());
        assert_eq!(telemetry.log_path(), Some(PathBuf::from("/tmp/w.log")));
    }

    #[test]
    fn test_sizes_clamped_to_one() {
        let config = parse(&["-t", "0", "-q", "0"]).server_config().unwrap();
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_log_file_follows_pipe_name() {
        assert_eq!(parse(&["-n", "preview"]).log_file_name(), "gfxworker.preview.log");
    }

    #[test]
    fn test_bad_pipe_name_rejected() {
        let result = parse(&["-n", "../escape"]).server_config();
        assert!(matches!(result, Err(ConfigError::InvalidChannelName { .. })));
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let result = Args::try_parse_from(["gfxworker", "-t", "many"]);
        assert!(result.is_err());
    }
}
