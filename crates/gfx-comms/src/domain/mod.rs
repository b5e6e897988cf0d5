//! Domain layer: value types, configuration and the error taxonomy.
//!
//! Nothing in here performs I/O.

pub mod config;
pub mod errors;
pub mod timeout;

pub use config::{
    ChannelName, ClientConfig, ServerConfig, ServerConfigBuilder, DEFAULT_MAX_FRAME_BYTES,
    MAX_CHANNEL_NAME_LEN,
};
pub use errors::{translate_os_code, CommError, ConfigError, ProcessError};
pub use timeout::{with_timeout, TimeoutMs};
