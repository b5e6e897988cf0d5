//! Server and client configuration with validation.
//!
//! # Example
//!
//! ```ignore
//! use gfx_comms::domain::{ServerConfigBuilder, TimeoutMs};
//!
//! let config = ServerConfigBuilder::new("gfxworker")
//!     .idle_timeout(TimeoutMs::from_secs_or_forever(60))
//!     .worker_threads(5)
//!     .queue_capacity(10)
//!     .build()?;
//! ```

use crate::domain::errors::ConfigError;
use crate::domain::timeout::TimeoutMs;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted channel name. Keeps Unix socket paths well under the
/// `sun_path` limit.
pub const MAX_CHANNEL_NAME_LEN: usize = 64;

/// Default upper bound for a single request or response payload.
pub const DEFAULT_MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Name of a local channel, validated so it can be embedded in a pipe path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let invalid = |reason| ConfigError::InvalidChannelName {
            name: name.clone(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("empty"));
        }
        if name.len() > MAX_CHANNEL_NAME_LEN {
            return Err(invalid("too long"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
        }
        if name.starts_with('.') {
            return Err(invalid("cannot start with '.'"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Platform path of the channel.
    ///
    /// Windows: `\\.\pipe\<name>`. Unix: `<temp_dir>/<name>.sock`.
    pub fn pipe_path(&self) -> PathBuf {
        if cfg!(windows) {
            PathBuf::from(format!(r"\\.\pipe\{}", self.0))
        } else {
            std::env::temp_dir().join(format!("{}.sock", self.0))
        }
    }

    /// Path of the advisory lock file that guards exclusive ownership of the
    /// name on Unix.
    pub fn lock_path(&self) -> PathBuf {
        std::env::temp_dir().join(format!("{}.lock", self.0))
    }
}

impl TryFrom<String> for ChannelName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelName> for String {
    fn from(name: ChannelName) -> Self {
        name.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for ChannelName {
    fn default() -> Self {
        Self("gfxworker".to_string())
    }
}

/// Listening server configuration.
///
/// Supplied once at construction and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Channel to listen on
    pub channel_name: ChannelName,
    /// Time without a new connection after which the server stops; 0 never stops
    #[serde(deserialize_with = "deserialize_idle_timeout")]
    pub idle_timeout: TimeoutMs,
    /// Number of request workers (>= 1)
    pub worker_threads: usize,
    /// Pending requests allowed while all workers are busy (>= 1)
    pub queue_capacity: usize,
    /// Deadline for reading each part of a request
    pub request_timeout: TimeoutMs,
    /// Deadline for writing each part of a response
    pub response_timeout: TimeoutMs,
    /// Largest request payload a worker will accept
    pub max_request_bytes: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            channel_name: ChannelName::default(),
            idle_timeout: TimeoutMs::from_secs_or_forever(60),
            worker_threads: 5,
            queue_capacity: 10,
            request_timeout: TimeoutMs::new(5_000),
            response_timeout: TimeoutMs::new(5_000),
            max_request_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

fn deserialize_idle_timeout<'de, D>(deserializer: D) -> Result<TimeoutMs, D::Error>
where
    D: Deserializer<'de>,
{
    TimeoutMs::deserialize(deserializer).map(TimeoutMs::zero_as_forever)
}

impl ServerConfig {
    /// Apply value conventions the fields cannot enforce themselves: an idle
    /// timeout of 0 means the server never stops on idle.
    pub fn normalized(mut self) -> Self {
        self.idle_timeout = self.idle_timeout.zero_as_forever();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NoQueueCapacity);
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::InvalidRequestLimit);
        }
        Ok(())
    }

    /// Connections that may be in flight at once, queued or being served.
    pub fn admission_limit(&self) -> usize {
        self.worker_threads.saturating_add(self.queue_capacity)
    }
}

/// Fluent builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    name: String,
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            name: channel_name.into(),
            config: ServerConfig::default(),
        }
    }

    /// 0 keeps the server listening until stopped.
    pub fn idle_timeout(mut self, timeout: TimeoutMs) -> Self {
        self.config.idle_timeout = timeout.zero_as_forever();
        self
    }

    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn request_timeout(mut self, timeout: TimeoutMs) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn response_timeout(mut self, timeout: TimeoutMs) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    pub fn max_request_bytes(mut self, limit: u32) -> Self {
        self.config.max_request_bytes = limit;
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let mut config = self.config;
        config.channel_name = ChannelName::new(self.name)?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }
}

/// Client-side connection and exchange settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on waiting for a saturated channel to free up
    pub busy_wait: Duration,
    /// Delay between open attempts while the channel is saturated
    pub busy_poll_interval: Duration,
    /// Deadline for writing each part of a request
    pub write_timeout: TimeoutMs,
    /// Deadline for reading each part of a response
    pub read_timeout: TimeoutMs,
    /// Largest response payload the client will accept
    pub max_response_bytes: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            busy_wait: Duration::from_secs(10),
            busy_poll_interval: Duration::from_millis(50),
            write_timeout: TimeoutMs::new(5_000),
            read_timeout: TimeoutMs::new(15_000),
            max_response_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_threads, 5);
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.admission_limit(), 15);
    }

    #[test]
    fn test_builder() {
        let config = ServerConfigBuilder::new("thumbs")
            .idle_timeout(TimeoutMs::forever())
            .worker_threads(2)
            .queue_capacity(3)
            .build()
            .unwrap();

        assert_eq!(config.channel_name.as_str(), "thumbs");
        assert!(config.idle_timeout.is_forever());
        assert_eq!(config.admission_limit(), 5);
    }

    #[test]
    fn test_builder_zero_idle_timeout_is_forever() {
        let config = ServerConfigBuilder::new("thumbs")
            .idle_timeout(TimeoutMs::new(0))
            .build()
            .unwrap();

        assert!(config.idle_timeout.is_forever());
    }

    #[test]
    fn test_deserialized_zero_idle_timeout_is_forever() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"channel_name": "thumbs", "idle_timeout": 0}"#).unwrap();
        assert!(config.idle_timeout.is_forever());
        assert_eq!(config.worker_threads, 5);

        let config: ServerConfig = serde_json::from_str(r#"{"idle_timeout": 1500}"#).unwrap();
        assert_eq!(config.idle_timeout, TimeoutMs::new(1500));
    }

    #[test]
    fn test_normalized_struct_literal() {
        let config = ServerConfig {
            idle_timeout: TimeoutMs::new(0),
            ..ServerConfig::default()
        }
        .normalized();

        assert!(config.idle_timeout.is_forever());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = ServerConfigBuilder::new("thumbs").worker_threads(0).build();
        assert_eq!(result.unwrap_err(), ConfigError::NoWorkers);
    }

    #[test]
    fn test_zero_queue_rejected() {
        let result = ServerConfigBuilder::new("thumbs").queue_capacity(0).build();
        assert_eq!(result.unwrap_err(), ConfigError::NoQueueCapacity);
    }

    #[test]
    fn test_channel_name_validation() {
        assert!(ChannelName::new("mega_gfxworker").is_ok());
        assert!(ChannelName::new("worker-1.a").is_ok());
        assert!(ChannelName::new("").is_err());
        assert!(ChannelName::new("../etc").is_err());
        assert!(ChannelName::new("a/b").is_err());
        assert!(ChannelName::new(r"a\b").is_err());
        assert!(ChannelName::new("x".repeat(MAX_CHANNEL_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_pipe_path_contains_name() {
        let name = ChannelName::new("thumbs").unwrap();
        let path = name.pipe_path();
        let rendered = path.to_string_lossy();
        assert!(rendered.contains("thumbs"));
        if cfg!(windows) {
            assert!(rendered.starts_with(r"\\.\pipe\"));
        } else {
            assert!(rendered.ends_with("thumbs.sock"));
        }
    }

    #[test]
    fn test_try_from_string() {
        let name = ChannelName::try_from("thumbs".to_string()).unwrap();
        assert_eq!(String::from(name), "thumbs");
        assert!(ChannelName::try_from("bad/name".to_string()).is_err());
    }
}
