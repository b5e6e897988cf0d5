//! OS channel layer.
//!
//! | Platform | Channel path              | Exclusivity                         | Busy signal        |
//! |----------|---------------------------|-------------------------------------|--------------------|
//! | Unix     | `<temp_dir>/<name>.sock`  | advisory lock on `<name>.lock`      | `WouldBlock`       |
//! | Windows  | `\\.\pipe\<name>`         | first pipe instance                 | `ERROR_PIPE_BUSY`  |
//!
//! Both sides hand out [`PipeEndpoint`](super::PipeEndpoint)s; the raw
//! socket or pipe handle never leaves this module.

use thiserror::Error;

use crate::domain::CommError;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use self::unix::{is_busy, open_channel, ChannelListener, ClientEndpoint, ServerEndpoint};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use self::windows::{is_busy, open_channel, ChannelListener, ClientEndpoint, ServerEndpoint};

/// Outcome of a failed `accept`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ListenError {
    /// No client arrived before the deadline.
    #[error("no connection before the deadline")]
    Timeout,

    /// Waiting for a client failed; the listener can be re-created.
    #[error("accept failed: {0}")]
    Connect(CommError),

    /// The listening instance could not be (re-)created.
    #[error("listener creation failed: {0}")]
    Create(CommError),
}
