//! # GFX Comms
//!
//! Local IPC between a client process and a graphics worker process: named
//! duplex channels, a bounded worker pool and idle-triggered shutdown.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure values, no I/O
//!   - `TimeoutMs`: milliseconds with a "forever" sentinel
//!   - `CommError`: closed error taxonomy and OS code translation
//!   - `ServerConfig` / `ClientConfig`: configuration with validation
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `Endpoint`: deadline-bounded duplex connection
//!   - `CommunicationsClient`: connection factory (driving)
//!   - `ProcessingUnit`, `GfxProcessor`: request handling (driven)
//!
//! - **Adapters Layer** (`adapters/`): OS channels
//!   - `PipeEndpoint`: `Endpoint` over any async byte stream
//!   - `ChannelListener`: Unix socket or Windows named pipe listener
//!
//! - **Server** (`server/`): `ListeningServer`, `RequestDispatcher`, `StopHandle`
//! - **Client** (`client/`): `GfxCommunicationsClient`, `GfxClient`
//! - **Protocol** (`protocol/`): framing and the GFX message set
//! - **Service** (`service/`): `RequestProcessor`
//!
//! ## Request Flow
//!
//! ```text
//!  client                        worker process
//!  ──────                        ──────────────
//!  connect ──────────────► ListeningServer.accept(idle_timeout)
//!                                 │
//!                                 ▼
//!                          RequestDispatcher.submit ──► full? drop (client sees EOF)
//!                                 │
//!                                 ▼
//!  write frame ──────────► worker: read frame
//!                                 │
//!                                 ▼
//!                          ProcessingUnit.process ──► error/panic → failure response
//!                                 │
//!  read frame ◄─────────── worker: write frame, close
//!                                 │
//!                                 ▼
//!                          stop requested? ──► STOPPED, drain, return
//! ```
//!
//! ## Invariants
//!
//! - At most one listening server owns a channel name at a time.
//! - Work in flight (queued or being served) never exceeds
//!   `worker_threads + queue_capacity`; the excess is rejected at accept.
//! - A finite idle timeout with no connection ends the run loop; in-flight
//!   requests are finished, never cancelled.
//!
//! ## Usage Example
//!
//! ```ignore
//! use gfx_comms::{ListeningServer, RequestProcessor, ServerConfigBuilder, TimeoutMs};
//! use std::sync::Arc;
//!
//! let config = ServerConfigBuilder::new("gfxworker")
//!     .idle_timeout(TimeoutMs::from_secs_or_forever(60))
//!     .build()?;
//! let server = ListeningServer::new(config, Arc::new(RequestProcessor::new(backend)))?;
//! let reason = server.run().await?;
//! ```

pub mod adapters;
pub mod client;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod protocol;
pub mod server;
pub mod service;

// Re-exports for convenience
pub use client::{GfxClient, GfxClientError, GfxCommunicationsClient};
pub use domain::{
    translate_os_code, ChannelName, ClientConfig, CommError, ConfigError, ProcessError,
    ServerConfig, ServerConfigBuilder, TimeoutMs,
};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use ports::{CommunicationsClient, Endpoint, GfxProcessor, Processed, ProcessingUnit};
pub use protocol::{
    GfxRequest, GfxResponse, GfxSize, GfxTask, GfxTaskResult, GfxTaskStatus, SupportedFormats,
};
pub use server::{ListeningServer, StopHandle, StopReason};
pub use service::RequestProcessor;
