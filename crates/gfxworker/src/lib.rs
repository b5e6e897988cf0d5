//! # GFX Worker
//!
//! Out-of-process graphics worker. Listens on a named channel, serves
//! requests from a bounded pool and exits once idle for the keep-alive
//! period, on a shutdown request, or on Ctrl-C.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line (`-l -t -q -n -d -f`)
//! 2. Initialize logging and metrics
//! 3. Claim the channel name (fails if another worker owns it)
//! 4. Serve until `STOPPED`, then drain in-flight requests

pub mod backend;
pub mod config;
pub mod metrics_bridge;

pub use backend::NoGraphicsBackend;
pub use config::Args;
pub use metrics_bridge::PrometheusRecorder;

use anyhow::{Context, Result};
use gfx_comms::{GfxProcessor, ListeningServer, RequestProcessor, StopHandle, StopReason};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Serve with the given graphics backend until the server stops.
pub async fn run<P>(args: &Args, processor: P) -> Result<StopReason>
where
    P: GfxProcessor + 'static,
{
    let config = args
        .server_config()
        .context("invalid worker configuration")?;

    info!(
        pipe_name = %config.channel_name,
        threads = config.worker_threads,
        queue_size = config.queue_capacity,
        keep_alive = %config.idle_timeout,
        "Gfxworker server starting"
    );

    let server = ListeningServer::new(config, Arc::new(RequestProcessor::new(processor)))?
        .with_metrics(Arc::new(PrometheusRecorder));

    let ctrl_c = spawn_ctrl_c_watcher(server.stop_handle());
    let result = server.run().await;
    ctrl_c.abort();

    let reason =
        result.with_context(|| format!("cannot listen on pipe {:?}", args.pipe_name))?;
    info!(reason = ?reason, "Gfxworker server stopped");

    match gfx_telemetry::encode_metrics() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(e) => debug!(error = %e, "Cannot encode metrics"),
    }

    Ok(reason)
}

/// Stop the server on Ctrl-C. The caller aborts the task once the server
/// has stopped.
fn spawn_ctrl_c_watcher(stop: StopHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping");
                stop.request_stop();
            }
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ctrl_c_watcher_aborts_without_stopping() {
        let stop = StopHandle::new();
        let watcher = spawn_ctrl_c_watcher(stop.clone());

        watcher.abort();
        let outcome = watcher.await;

        assert!(outcome.unwrap_err().is_cancelled());
        assert!(!stop.is_stop_requested());
    }
}
