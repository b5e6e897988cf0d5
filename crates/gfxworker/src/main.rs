//! `gfxworker` entry point.

use anyhow::{bail, Context, Result};
use clap::Parser;
use gfx_comms::StopReason;
use gfx_telemetry::{init_telemetry, TelemetryConfig};

use gfxworker::{Args, NoGraphicsBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _telemetry = init_telemetry(args.telemetry_config(TelemetryConfig::from_env()))
        .context("failed to initialize telemetry")?;

    match gfxworker::run(&args, NoGraphicsBackend).await? {
        StopReason::ListenerFailed(e) => bail!("listener failed: {e}"),
        StopReason::IdleTimeout | StopReason::ShutdownRequested => Ok(()),
    }
}
