//! Serialization layer on top of raw endpoint bytes.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────┐
//! │ len: u32 LE  │ payload: bincode(GfxRequest)  │   client → worker
//! └──────────────┴───────────────────────────────┘
//! ┌──────────────┬───────────────────────────────┐
//! │ len: u32 LE  │ payload: bincode(GfxResponse) │   worker → client
//! └──────────────┴───────────────────────────────┘
//! ```
//!
//! One frame in each direction per connection.

pub mod frame;
pub mod messages;

pub use frame::{
    discard_payload, read_frame, write_frame, FrameError, FRAME_HEADER_LEN, MAX_DISCARD_BYTES,
};
pub use messages::{
    CodecError, GfxRequest, GfxResponse, GfxSize, GfxTask, GfxTaskResult, GfxTaskStatus,
    SupportedFormats,
};
