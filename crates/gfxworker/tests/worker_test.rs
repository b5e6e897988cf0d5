//! End-to-end run of the worker entry point over a real channel.

#![cfg(unix)]

use clap::Parser;
use gfx_comms::{
    ChannelName, GfxClient, GfxCommunicationsClient, GfxSize, GfxTask, GfxTaskStatus, StopReason,
};
use gfxworker::{Args, NoGraphicsBackend};
use std::time::Duration;

fn args_for(name: &str, keep_alive: &str) -> Args {
    Args::try_parse_from(["gfxworker", "-n", name, "-l", keep_alive, "-t", "2", "-q", "2"]).unwrap()
}

async fn wait_until_listening(name: &ChannelName) {
    for _ in 0..500 {
        if name.pipe_path().exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("worker never started listening");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_serves_until_shutdown() {
    let pipe = format!("gfxworker-it-{}", uuid::Uuid::new_v4().simple());
    let name = ChannelName::new(pipe.clone()).unwrap();
    let args = args_for(&pipe, "0");

    let worker = tokio::spawn(async move { gfxworker::run(&args, NoGraphicsBackend).await });
    wait_until_listening(&name).await;

    let client = GfxClient::new(GfxCommunicationsClient::new(name));
    assert_eq!(client.run_hello("ping").await.unwrap(), "ping");

    let formats = client.run_support_formats().await.unwrap();
    assert!(formats.formats.is_empty());

    let result = client
        .run_gfx_task(GfxTask {
            path: "/tmp/photo.jpg".to_string(),
            sizes: vec![GfxSize::new(100, 100)],
        })
        .await
        .unwrap();
    assert_eq!(result.status, GfxTaskStatus::Error);
    assert!(result.error_text.contains("no graphics backend"));

    client.run_shutdown().await.unwrap();
    let reason = worker.await.unwrap().unwrap();
    assert_eq!(reason, StopReason::ShutdownRequested);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_exits_after_keep_alive() {
    let pipe = format!("gfxworker-idle-{}", uuid::Uuid::new_v4().simple());
    let args = args_for(&pipe, "1");

    let reason = tokio::time::timeout(
        Duration::from_secs(5),
        gfxworker::run(&args, NoGraphicsBackend),
    )
    .await
    .expect("worker ignored keep-alive")
    .unwrap();
    assert_eq!(reason, StopReason::IdleTimeout);
}
