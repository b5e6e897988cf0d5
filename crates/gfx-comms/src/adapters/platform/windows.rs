//! Named pipe channels.

use std::io;
use std::path::{Path, PathBuf};
use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions};
use tracing::{debug, info, warn};

use super::ListenError;
use crate::adapters::PipeEndpoint;
use crate::domain::{with_timeout, ChannelName, CommError, TimeoutMs};

pub type ServerEndpoint = PipeEndpoint<NamedPipeServer>;
pub type ClientEndpoint = PipeEndpoint<NamedPipeClient>;

const ERROR_ACCESS_DENIED: i32 = 5;
const ERROR_PIPE_BUSY: i32 = 231;
const PIPE_BUFFER_SIZE: u32 = 512;

/// Listening side of a named pipe.
///
/// Holds at most one unconnected pipe instance. A connected instance is
/// handed to the caller and a fresh one is created on the next accept.
pub struct ChannelListener {
    path: PathBuf,
    pending: Option<NamedPipeServer>,
}

impl ChannelListener {
    /// Create the first pipe instance for `name`.
    ///
    /// Fails with [`CommError::AlreadyExists`] when any other server already
    /// owns the name.
    pub fn bind(name: &ChannelName) -> Result<Self, CommError> {
        let path = name.pipe_path();
        let first = create_instance(&path, true)?;
        info!(channel = %name, path = %path.display(), "Listening");
        Ok(Self {
            path,
            pending: Some(first),
        })
    }

    /// Wait for one client.
    ///
    /// `connect` is cancel safe, so an expired deadline keeps the pending
    /// instance for the next call. A client that connected just as the
    /// deadline passed is still returned.
    pub async fn accept(&mut self, timeout: TimeoutMs) -> Result<ServerEndpoint, ListenError> {
        if self.pending.is_none() {
            let instance = create_instance(&self.path, false).map_err(ListenError::Create)?;
            self.pending = Some(instance);
        }
        let Some(pending) = self.pending.as_mut() else {
            return Err(ListenError::Create(CommError::Generic));
        };

        match with_timeout(timeout, pending.connect()).await {
            None => Err(ListenError::Timeout),
            Some(Ok(())) => match self.pending.take() {
                Some(connected) => Ok(PipeEndpoint::server(connected)),
                None => Err(ListenError::Create(CommError::Generic)),
            },
            Some(Err(e)) => {
                debug!(error = %e, "ConnectNamedPipe failed, dropping instance");
                self.pending = None;
                Err(ListenError::Connect(CommError::from_io(&e)))
            }
        }
    }
}

fn create_instance(path: &Path, first: bool) -> Result<NamedPipeServer, CommError> {
    ServerOptions::new()
        .first_pipe_instance(first)
        .in_buffer_size(PIPE_BUFFER_SIZE)
        .out_buffer_size(PIPE_BUFFER_SIZE)
        .create(path)
        .map_err(|e| {
            if first && e.raw_os_error() == Some(ERROR_ACCESS_DENIED) {
                return CommError::AlreadyExists;
            }
            warn!(path = %path.display(), error = %e, "CreateNamedPipe failed");
            CommError::from_io(&e)
        })
}

/// Open a client handle to the pipe behind `name`.
pub async fn open_channel(name: &ChannelName) -> io::Result<ClientEndpoint> {
    ClientOptions::new()
        .open(name.pipe_path())
        .map(PipeEndpoint::client)
}

/// All pipe instances are connected to other clients.
pub fn is_busy(error: &io::Error) -> bool {
    error.raw_os_error() == Some(ERROR_PIPE_BUSY)
}
