//! Listening server: accept loop with idle-timeout-driven termination.
//!
//! ```text
//!                 ┌─────────────────────────────────────────┐
//!                 │                LISTENING                │
//!                 └─────────────────────────────────────────┘
//!   Connected(false) │ TimedOut(forever) │ ConnectFailed   ▲
//!                    └───────────────────┴─────────────────┘
//!
//!   Connected(true) │ StopRequested │ TimedOut(finite) │ CreateFailed
//!                   ▼
//!                 ┌─────────────────────────────────────────┐
//!                 │            STOPPED (terminal)           │
//!                 └─────────────────────────────────────────┘
//! ```
//!
//! The accept wait races three things: an inbound connection, the idle
//! deadline and the stop flag. The stop flag is checked first. Between a
//! connection and the deadline, the connection wins when both are ready at
//! the same poll: the accept is polled before the timer.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::adapters::{ChannelListener, ListenError};
use crate::domain::{CommError, ConfigError, ServerConfig, TimeoutMs};
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::ProcessingUnit;
use crate::server::{RequestDispatcher, StopHandle};

/// Why the run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No connection arrived within the idle timeout.
    IdleTimeout,
    /// A processing unit or the hosting process asked to stop.
    ShutdownRequested,
    /// The listening instance could not be re-created.
    ListenerFailed(CommError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Listening,
    Stopped(StopReason),
}

/// What one accept wait produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptEvent {
    /// A client connected; the dispatcher answered whether to stop.
    Connected { should_stop: bool },
    TimedOut,
    ConnectFailed(CommError),
    CreateFailed(CommError),
    StopRequested,
}

/// Next state after `event`, given the configured idle timeout.
pub fn transition(event: AcceptEvent, idle_timeout: TimeoutMs) -> ServerState {
    match event {
        AcceptEvent::Connected { should_stop: false } => ServerState::Listening,
        AcceptEvent::Connected { should_stop: true } | AcceptEvent::StopRequested => {
            ServerState::Stopped(StopReason::ShutdownRequested)
        }
        AcceptEvent::TimedOut if idle_timeout.is_forever() => ServerState::Listening,
        AcceptEvent::TimedOut => ServerState::Stopped(StopReason::IdleTimeout),
        AcceptEvent::ConnectFailed(_) => ServerState::Listening,
        AcceptEvent::CreateFailed(e) => ServerState::Stopped(StopReason::ListenerFailed(e)),
    }
}

/// Owns a channel name for the lifetime of [`ListeningServer::run`].
pub struct ListeningServer {
    config: ServerConfig,
    unit: Arc<dyn ProcessingUnit>,
    metrics: Arc<dyn MetricsRecorder>,
    stop: StopHandle,
}

impl ListeningServer {
    pub fn new(config: ServerConfig, unit: Arc<dyn ProcessingUnit>) -> Result<Self, ConfigError> {
        let config = config.normalized();
        config.validate()?;
        Ok(Self {
            config,
            unit,
            metrics: Arc::new(NoOpMetrics),
            stop: StopHandle::new(),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle that stops the server from outside, e.g. on Ctrl-C.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Listen until the server reaches `STOPPED`.
    ///
    /// Fails only when the channel cannot be claimed in the first place, for
    /// example with [`CommError::AlreadyExists`]. Work already admitted is
    /// finished before this returns.
    pub async fn run(self) -> Result<StopReason, CommError> {
        let Self {
            config,
            unit,
            metrics,
            stop,
        } = self;

        let mut listener = ChannelListener::bind(&config.channel_name).map_err(|e| {
            error!(channel = %config.channel_name, error = %e, "Cannot create listener");
            e
        })?;
        let dispatcher = RequestDispatcher::start(&config, unit, stop.clone(), metrics.clone());
        let mut stop_rx = stop.subscribe();
        let idle_timeout = config.idle_timeout;

        info!(
            channel = %config.channel_name,
            idle_timeout = %idle_timeout,
            "Server listening"
        );

        let reason = loop {
            let event = tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stop| *stop) => AcceptEvent::StopRequested,
                accepted = listener.accept(idle_timeout) => match accepted {
                    Ok(endpoint) => AcceptEvent::Connected {
                        should_stop: dispatcher.submit(Box::new(endpoint)),
                    },
                    Err(ListenError::Timeout) => {
                        metrics.record_idle_timeout();
                        AcceptEvent::TimedOut
                    }
                    Err(ListenError::Connect(e)) => {
                        warn!(error = %e, "Accept failed, listening again");
                        AcceptEvent::ConnectFailed(e)
                    }
                    Err(ListenError::Create(e)) => {
                        error!(error = %e, "Listener re-creation failed");
                        AcceptEvent::CreateFailed(e)
                    }
                },
            };

            if let ServerState::Stopped(reason) = transition(event, idle_timeout) {
                break reason;
            }
        };

        info!(reason = ?reason, "Server stopping");
        // Release the name first so new clients fail fast while we drain.
        drop(listener);
        dispatcher.shutdown().await;
        info!(channel = %config.channel_name, "Server stopped");
        Ok(reason)
    }
}
