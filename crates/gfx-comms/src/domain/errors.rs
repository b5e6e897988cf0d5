//! Error types for the GFX communication layer.
//!
//! Every failure reported by the OS channel primitive is translated into the
//! closed [`CommError`] set at the point of contact. Raw platform codes never
//! travel past the adapters.

use std::io;
use thiserror::Error;

/// Closed communication error taxonomy.
///
/// Success is `Ok(..)` of a `Result<_, CommError>`; there is no `Ok` variant.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommError {
    /// Catch-all for anything not listed below.
    #[error("communication error")]
    Generic,

    /// The named channel has no listener.
    #[error("channel does not exist")]
    NotExist,

    /// The deadline elapsed.
    #[error("operation timed out")]
    Timeout,

    /// Another listener already owns the channel name.
    #[error("channel already exists")]
    AlreadyExists,
}

impl CommError {
    /// Translate an I/O error from the channel primitive.
    ///
    /// The raw OS code wins when present; otherwise the portable error kind
    /// is used.
    pub fn from_io(error: &io::Error) -> Self {
        match error.raw_os_error() {
            Some(code) => match translate_os_code(code) {
                Ok(()) => CommError::Generic,
                Err(e) => e,
            },
            None => Self::from_kind(error.kind()),
        }
    }

    /// Translate a portable error kind.
    pub fn from_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => CommError::NotExist,
            io::ErrorKind::TimedOut => CommError::Timeout,
            io::ErrorKind::AddrInUse | io::ErrorKind::AlreadyExists => CommError::AlreadyExists,
            _ => CommError::Generic,
        }
    }

    /// Short stable label, used for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommError::Generic => "err",
            CommError::NotExist => "not_exist",
            CommError::Timeout => "timeout",
            CommError::AlreadyExists => "already_exists",
        }
    }
}

/// Map a raw platform error code to the taxonomy.
///
/// Code 0 is success. Unknown codes become [`CommError::Generic`].
pub fn translate_os_code(code: i32) -> Result<(), CommError> {
    if code == 0 {
        return Ok(());
    }
    Err(CommError::from_kind(
        io::Error::from_raw_os_error(code).kind(),
    ))
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid channel name {name:?}: {reason}")]
    InvalidChannelName { name: String, reason: &'static str },

    #[error("worker_threads must be at least 1")]
    NoWorkers,

    #[error("queue_capacity must be at least 1")]
    NoQueueCapacity,

    #[error("max_request_bytes cannot be 0")]
    InvalidRequestLimit,
}

/// Failure raised by a processing unit while serving one request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Malformed request: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Processing failed: {0}")]
    Failed(String),

    #[error("Processing unit panicked: {0}")]
    Panicked(String),
}
