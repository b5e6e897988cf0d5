//! [`Endpoint`] adapter over any async byte stream.
//!
//! The platform layer hands over a Unix socket or a named-pipe handle; tests
//! use in-memory `tokio::io::duplex` streams. The stream is owned by the
//! endpoint and never exposed.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::domain::{with_timeout, TimeoutMs};
use crate::ports::Endpoint;

/// Which side of the channel an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    Client,
    Server,
}

impl EndpointRole {
    fn as_str(&self) -> &'static str {
        match self {
            EndpointRole::Client => "client",
            EndpointRole::Server => "server",
        }
    }
}

/// Deadline-bounded duplex endpoint.
pub struct PipeEndpoint<S> {
    stream: S,
    role: EndpointRole,
    closed: bool,
}

impl<S> PipeEndpoint<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, role: EndpointRole) -> Self {
        Self {
            stream,
            role,
            closed: false,
        }
    }

    pub fn client(stream: S) -> Self {
        Self::new(stream, EndpointRole::Client)
    }

    pub fn server(stream: S) -> Self {
        Self::new(stream, EndpointRole::Server)
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }
}

#[async_trait]
impl<S> Endpoint for PipeEndpoint<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8], timeout: TimeoutMs) -> bool {
        if self.closed {
            return false;
        }
        if buf.is_empty() {
            return true;
        }

        match with_timeout(timeout, self.stream.read_exact(buf)).await {
            Some(Ok(_)) => {
                trace!(endpoint = self.role.as_str(), bytes = buf.len(), "read");
                true
            }
            Some(Err(e)) => {
                debug!(endpoint = self.role.as_str(), error = %e, "read failed");
                false
            }
            None => {
                debug!(endpoint = self.role.as_str(), %timeout, "read timed out");
                false
            }
        }
    }

    async fn write(&mut self, buf: &[u8], timeout: TimeoutMs) -> bool {
        if self.closed {
            return false;
        }
        if buf.is_empty() {
            return true;
        }

        let transfer = async {
            self.stream.write_all(buf).await?;
            self.stream.flush().await
        };

        match with_timeout(timeout, transfer).await {
            Some(Ok(())) => {
                trace!(endpoint = self.role.as_str(), bytes = buf.len(), "write");
                true
            }
            Some(Err(e)) => {
                debug!(endpoint = self.role.as_str(), error = %e, "write failed");
                false
            }
            None => {
                debug!(endpoint = self.role.as_str(), %timeout, "write timed out");
                false
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.role == EndpointRole::Server {
            trace!(endpoint = self.role.as_str(), "flush");
            if let Err(e) = self.stream.flush().await {
                debug!(endpoint = self.role.as_str(), error = %e, "flush on close failed");
            }
        }
        trace!(endpoint = self.role.as_str(), "disconnect");
        if let Err(e) = self.stream.shutdown().await {
            debug!(endpoint = self.role.as_str(), error = %e, "shutdown on close failed");
        }
    }

    fn name(&self) -> &str {
        self.role.as_str()
    }
}
