//! Client side: connection factory and typed request helpers.

pub mod gfx_client;

pub use gfx_client::{GfxClient, GfxClientError};

use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::adapters::{is_busy, open_channel};
use crate::domain::{ChannelName, ClientConfig, CommError};
use crate::ports::{CommunicationsClient, Endpoint};

/// Connects to a worker's named channel.
#[derive(Debug, Clone)]
pub struct GfxCommunicationsClient {
    name: ChannelName,
    config: ClientConfig,
}

impl GfxCommunicationsClient {
    pub fn new(name: ChannelName) -> Self {
        Self::with_config(name, ClientConfig::default())
    }

    pub fn with_config(name: ChannelName, config: ClientConfig) -> Self {
        Self { name, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn channel_name(&self) -> &ChannelName {
        &self.name
    }
}

#[async_trait]
impl CommunicationsClient for GfxCommunicationsClient {
    async fn connect(&self) -> Result<Box<dyn Endpoint>, CommError> {
        let endpoint = connect_with_retry(
            || open_channel(&self.name),
            is_busy,
            self.config.busy_wait,
            self.config.busy_poll_interval,
        )
        .await
        .map_err(|e| {
            debug!(channel = %self.name, error = %e, "Connect failed");
            e
        })?;
        Ok(Box::new(endpoint))
    }
}

/// Open a channel, waiting out saturation.
///
/// While `open` fails with a busy error the attempt is repeated every
/// `poll_interval`; once `busy_wait` has passed since the first busy answer
/// the result is [`CommError::Timeout`]. Any other error is translated and
/// returned at once.
pub async fn connect_with_retry<T, F, Fut>(
    mut open: F,
    is_busy: fn(&io::Error) -> bool,
    busy_wait: Duration,
    poll_interval: Duration,
) -> Result<T, CommError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let mut busy_since: Option<Instant> = None;
    loop {
        match open().await {
            Ok(endpoint) => return Ok(endpoint),
            Err(e) if is_busy(&e) => {
                let since = *busy_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= busy_wait {
                    warn!(waited_ms = busy_wait.as_millis() as u64, "Channel stayed busy");
                    return Err(CommError::Timeout);
                }
                debug!("Channel busy, retrying");
                tokio::time::sleep(poll_interval).await;
            }
            Err(e) => return Err(CommError::from_io(&e)),
        }
    }
}
