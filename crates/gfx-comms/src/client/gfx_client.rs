//! Typed request helpers over a [`CommunicationsClient`].
//!
//! Each call is one connection: connect, write one framed request, read one
//! framed response, close.

use thiserror::Error;
use tracing::debug;

use crate::domain::{ClientConfig, CommError};
use crate::ports::CommunicationsClient;
use crate::protocol::{
    read_frame, write_frame, FrameError, GfxRequest, GfxResponse, GfxTask, GfxTaskResult,
    SupportedFormats,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GfxClientError {
    #[error("Cannot connect to worker: {0}")]
    Connect(#[from] CommError),

    #[error("Cannot encode request: {0}")]
    Encode(String),

    #[error("Failed to send request")]
    SendFailed,

    /// The worker closed the connection without answering. This is what a
    /// client rejected for capacity sees.
    #[error("Worker closed the connection without a response")]
    NoResponse,

    #[error("Malformed response: {0}")]
    Decode(String),

    /// The worker ran the request and reported a failure.
    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Unexpected response to {0} request")]
    UnexpectedResponse(&'static str),
}

impl GfxClientError {
    /// Whether trying the same request again later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GfxClientError::NoResponse
                | GfxClientError::SendFailed
                | GfxClientError::Connect(CommError::Timeout)
        )
    }
}

pub struct GfxClient<C> {
    comms: C,
    config: ClientConfig,
}

impl<C: CommunicationsClient> GfxClient<C> {
    pub fn new(comms: C) -> Self {
        Self::with_config(comms, ClientConfig::default())
    }

    pub fn with_config(comms: C, config: ClientConfig) -> Self {
        Self { comms, config }
    }

    /// Liveness probe; the worker echoes `text`.
    pub async fn run_hello(&self, text: &str) -> Result<String, GfxClientError> {
        let request = GfxRequest::Hello {
            text: text.to_string(),
        };
        match self.exchange(&request).await? {
            GfxResponse::Hello { text } => Ok(text),
            _ => Err(GfxClientError::UnexpectedResponse(request.kind())),
        }
    }

    /// Ask the worker to stop once this request is served.
    pub async fn run_shutdown(&self) -> Result<(), GfxClientError> {
        let request = GfxRequest::Shutdown;
        match self.exchange(&request).await? {
            GfxResponse::Shutdown => Ok(()),
            _ => Err(GfxClientError::UnexpectedResponse(request.kind())),
        }
    }

    pub async fn run_support_formats(&self) -> Result<SupportedFormats, GfxClientError> {
        let request = GfxRequest::SupportFormats;
        match self.exchange(&request).await? {
            GfxResponse::SupportFormats(formats) => Ok(formats),
            _ => Err(GfxClientError::UnexpectedResponse(request.kind())),
        }
    }

    /// Render `task`. A task the backend could not render comes back as a
    /// result with an error status, not as `Err`.
    pub async fn run_gfx_task(&self, task: GfxTask) -> Result<GfxTaskResult, GfxClientError> {
        let request = GfxRequest::NewGfx(task);
        match self.exchange(&request).await? {
            GfxResponse::NewGfx(result) => Ok(result),
            _ => Err(GfxClientError::UnexpectedResponse(request.kind())),
        }
    }

    async fn exchange(&self, request: &GfxRequest) -> Result<GfxResponse, GfxClientError> {
        let payload = request
            .to_bytes()
            .map_err(|e| GfxClientError::Encode(e.message))?;

        let mut endpoint = self.comms.connect().await?;

        // A worker that refuses a request may answer and hang up before the
        // whole request is written, so a failed write still reads a reply.
        let sent = write_frame(endpoint.as_mut(), &payload, self.config.write_timeout).await;
        let received = read_frame(
            endpoint.as_mut(),
            self.config.max_response_bytes,
            self.config.read_timeout,
        )
        .await;
        endpoint.close().await;

        let bytes = match (sent, received) {
            (_, Ok(bytes)) => bytes,
            (Err(e), Err(_)) => {
                debug!(request = request.kind(), error = %e, "Send failed");
                return Err(GfxClientError::SendFailed);
            }
            (Ok(()), Err(FrameError::Closed(_))) => return Err(GfxClientError::NoResponse),
            (Ok(()), Err(e @ FrameError::TooLarge { .. })) => {
                return Err(GfxClientError::Decode(e.to_string()))
            }
        };

        match GfxResponse::from_bytes(&bytes).map_err(|e| GfxClientError::Decode(e.message))? {
            GfxResponse::Error { message } => Err(GfxClientError::Worker(message)),
            response => Ok(response),
        }
    }
}
