//! Adapters: concrete endpoints and the OS channel layer.

pub mod pipe_endpoint;
pub mod platform;

pub use pipe_endpoint::{EndpointRole, PipeEndpoint};
pub use platform::{is_busy, open_channel, ChannelListener, ClientEndpoint, ListenError, ServerEndpoint};
