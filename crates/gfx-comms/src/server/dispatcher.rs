//! Bounded work queue and fixed worker pool.
//!
//! ```text
//!                    submit()                    ┌──────────┐
//!  acceptor ──► [admission: pool + queue] ──► ───┤ worker 0 ├──► read → process → write → close
//!                    │ full                 mpsc  ├──────────┤
//!                    ▼                            │ worker 1 │
//!               drop endpoint                     ├──────────┤
//!               (client sees EOF)                 │   ...    │
//!                                                 └──────────┘
//! ```
//!
//! Admission counts work in flight, queued or being processed, so the
//! acceptor never waits on the queue and the number of rejected clients is
//! exact: with `P` workers and queue capacity `Q`, the first `P + Q`
//! concurrent connections are served and every further one is dropped.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::domain::{ProcessError, ServerConfig, TimeoutMs};
use crate::metrics::MetricsRecorder;
use crate::ports::{Endpoint, ProcessingUnit};
use crate::protocol::{discard_payload, read_frame, write_frame, FrameError};
use crate::server::StopHandle;

/// An accepted endpoint waiting for a worker.
///
/// Holds its admission permit until the connection is fully served.
struct WorkItem {
    endpoint: Box<dyn Endpoint>,
    _permit: OwnedSemaphorePermit,
}

/// Everything a worker needs to serve one connection.
struct WorkerContext {
    unit: Arc<dyn ProcessingUnit>,
    stop: StopHandle,
    metrics: Arc<dyn MetricsRecorder>,
    request_timeout: TimeoutMs,
    response_timeout: TimeoutMs,
    max_request_bytes: u32,
}

pub struct RequestDispatcher {
    sender: mpsc::Sender<WorkItem>,
    admission: Arc<Semaphore>,
    admission_limit: usize,
    workers: Vec<JoinHandle<()>>,
    stop: StopHandle,
    metrics: Arc<dyn MetricsRecorder>,
}

impl RequestDispatcher {
    /// Spawn `config.worker_threads` workers on the current runtime.
    pub fn start(
        config: &ServerConfig,
        unit: Arc<dyn ProcessingUnit>,
        stop: StopHandle,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        let admission_limit = config.admission_limit();
        let (sender, receiver) = mpsc::channel(admission_limit);
        let receiver = Arc::new(Mutex::new(receiver));

        let context = Arc::new(WorkerContext {
            unit,
            stop: stop.clone(),
            metrics: metrics.clone(),
            request_timeout: config.request_timeout,
            response_timeout: config.response_timeout,
            max_request_bytes: config.max_request_bytes,
        });

        let workers = (0..config.worker_threads)
            .map(|id| {
                let receiver = receiver.clone();
                let context = context.clone();
                tokio::spawn(
                    worker_loop(receiver, context).instrument(info_span!("gfx_worker", worker = id)),
                )
            })
            .collect();

        info!(
            workers = config.worker_threads,
            queue_capacity = config.queue_capacity,
            "Request dispatcher started"
        );

        Self {
            sender,
            admission: Arc::new(Semaphore::new(admission_limit)),
            admission_limit,
            workers,
            stop,
            metrics,
        }
    }

    /// Hand an accepted endpoint to the pool.
    ///
    /// Never waits. When the pool and the queue are both full the endpoint is
    /// dropped unprocessed. Returns whether the server should stop.
    pub fn submit(&self, endpoint: Box<dyn Endpoint>) -> bool {
        match self.admission.clone().try_acquire_owned() {
            Ok(permit) => {
                let item = WorkItem {
                    endpoint,
                    _permit: permit,
                };
                match self.sender.try_send(item) {
                    Ok(()) => {
                        self.metrics.record_connection_accepted();
                        debug!(in_flight = self.in_flight(), "Connection queued");
                    }
                    Err(e) => {
                        warn!(error = %e, "Work queue unavailable, dropping connection");
                        self.metrics.record_connection_rejected();
                    }
                }
            }
            Err(_) => {
                warn!(
                    limit = self.admission_limit,
                    "Work queue full, rejecting connection"
                );
                self.metrics.record_connection_rejected();
                drop(endpoint);
            }
        }
        self.stop.is_stop_requested()
    }

    /// Connections admitted and not yet fully served.
    pub fn in_flight(&self) -> usize {
        self.admission_limit - self.admission.available_permits()
    }

    /// Close the queue and wait for workers to drain it.
    pub async fn shutdown(self) {
        let Self { sender, workers, .. } = self;
        drop(sender);

        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Worker task failed");
            }
        }
        info!("Request dispatcher stopped");
    }
}

async fn worker_loop(receiver: Arc<Mutex<mpsc::Receiver<WorkItem>>>, context: Arc<WorkerContext>) {
    debug!("Worker started");
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(item) = next else {
            break;
        };
        context.serve(item).await;
    }
    debug!("Worker exiting");
}

impl WorkerContext {
    async fn serve(&self, mut item: WorkItem) {
        let started = Instant::now();
        let endpoint = item.endpoint.as_mut();

        let request = match read_frame(endpoint, self.max_request_bytes, self.request_timeout).await
        {
            Ok(request) => Some(request),
            Err(FrameError::TooLarge { len, max }) => {
                warn!(len, max, "Request too large");
                // The client reads its answer only after sending everything.
                if !discard_payload(endpoint, len, self.request_timeout).await {
                    debug!(len, "Refused payload not drained");
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read request");
                self.metrics.record_endpoint_failure();
                endpoint.close().await;
                return;
            }
        };

        let (response, success, stop) = match request {
            Some(request) => self.process(request).await,
            None => {
                let error = ProcessError::InvalidRequest(format!(
                    "request exceeds {} bytes",
                    self.max_request_bytes
                ));
                (self.unit.failure_response(&error), false, false)
            }
        };

        match write_frame(endpoint, &response, self.response_timeout).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                debug!(elapsed_ms = elapsed.as_millis() as u64, success, "Request served");
                self.metrics.record_request_completed(elapsed, success);
            }
            Err(e) => {
                warn!(error = %e, "Failed to write response");
                self.metrics.record_endpoint_failure();
            }
        }
        endpoint.close().await;

        if stop {
            info!("Processing unit requested server stop");
            self.stop.request_stop();
        }
    }

    /// Run the processing unit, turning errors and panics into a failure
    /// response.
    async fn process(&self, request: Vec<u8>) -> (Vec<u8>, bool, bool) {
        let len = request.len();
        match AssertUnwindSafe(self.unit.process(request)).catch_unwind().await {
            Ok(Ok(processed)) => (processed.response, true, processed.stop),
            Ok(Err(e)) => {
                warn!(error = %e, request_len = len, "Processing failed");
                (self.unit.failure_response(&e), false, false)
            }
            Err(panic) => {
                let e = ProcessError::Panicked(panic_message(panic.as_ref()));
                error!(error = %e, request_len = len, "Processing unit panicked");
                (self.unit.failure_response(&e), false, false)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
