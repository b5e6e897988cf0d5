//! Processing ports (driven side).
//!
//! - [`ProcessingUnit`]: turns one request payload into one response payload.
//!   The worker pool calls it once per accepted connection.
//! - [`GfxProcessor`]: the pixel work behind the GFX message set. Decoding
//!   images and rendering thumbnails lives behind this trait.

use async_trait::async_trait;

use crate::domain::ProcessError;
use crate::protocol::{GfxTask, SupportedFormats};

/// Result of serving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// Bytes to send back on the same endpoint
    pub response: Vec<u8>,
    /// Ask the listening server to stop after this connection
    pub stop: bool,
}

impl Processed {
    pub fn reply(response: Vec<u8>) -> Self {
        Self {
            response,
            stop: false,
        }
    }

    pub fn reply_and_stop(response: Vec<u8>) -> Self {
        Self {
            response,
            stop: true,
        }
    }
}

/// Serves one request payload.
///
/// Failures must still be answerable: [`ProcessingUnit::failure_response`]
/// renders an error as a payload the client can tell apart from success.
#[async_trait]
pub trait ProcessingUnit: Send + Sync {
    async fn process(&self, request: Vec<u8>) -> Result<Processed, ProcessError>;

    fn failure_response(&self, error: &ProcessError) -> Vec<u8>;
}

/// Graphics backend. Synchronous and CPU bound; callers run it off the
/// async executor.
pub trait GfxProcessor: Send + Sync {
    /// Image and video formats this backend can decode.
    fn supported_formats(&self) -> SupportedFormats;

    /// Render one image per requested size, in request order.
    fn process(&self, task: &GfxTask) -> Result<Vec<Vec<u8>>, String>;
}
