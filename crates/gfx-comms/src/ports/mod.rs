//! Ports: the trait seams between the core and its collaborators.

pub mod client;
pub mod endpoint;
pub mod processing;

pub use client::CommunicationsClient;
pub use endpoint::Endpoint;
pub use processing::{GfxProcessor, Processed, ProcessingUnit};
