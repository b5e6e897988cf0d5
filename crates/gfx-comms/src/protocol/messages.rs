//! GFX message set carried inside frames.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Message could not be encoded or decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("codec error: {message}")]
pub struct CodecError {
    pub message: String,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError {
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError {
        message: e.to_string(),
    })
}

/// Requested output dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GfxSize {
    pub width: u32,
    pub height: u32,
}

impl GfxSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Render previews of one local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfxTask {
    /// Local path of the source image or video
    pub path: String,
    /// One output per entry, in order
    pub sizes: Vec<GfxSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GfxTaskStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfxTaskResult {
    pub status: GfxTaskStatus,
    /// Empty on success
    pub error_text: String,
    /// Encoded images, one per requested size
    pub images: Vec<Vec<u8>>,
}

impl GfxTaskResult {
    pub fn success(images: Vec<Vec<u8>>) -> Self {
        Self {
            status: GfxTaskStatus::Success,
            error_text: String::new(),
            images,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            status: GfxTaskStatus::Error,
            error_text: text.into(),
            images: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GfxTaskStatus::Success
    }
}

/// Decodable formats, as file extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedFormats {
    pub formats: Vec<String>,
    pub video_formats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GfxRequest {
    Hello { text: String },
    Shutdown,
    SupportFormats,
    NewGfx(GfxTask),
}

impl GfxRequest {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes)
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GfxRequest::Hello { .. } => "hello",
            GfxRequest::Shutdown => "shutdown",
            GfxRequest::SupportFormats => "support_formats",
            GfxRequest::NewGfx(_) => "new_gfx",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GfxResponse {
    Hello { text: String },
    Shutdown,
    SupportFormats(SupportedFormats),
    NewGfx(GfxTaskResult),
    /// The request could not be served at all.
    Error { message: String },
}

impl GfxResponse {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes)
    }
}
