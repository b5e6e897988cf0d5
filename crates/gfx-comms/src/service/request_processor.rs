//! [`ProcessingUnit`] that speaks the GFX message set.
//!
//! | Request          | Response                    | Stops server |
//! |------------------|-----------------------------|--------------|
//! | `Hello`          | `Hello` (same text)         | no           |
//! | `Shutdown`       | `Shutdown`                  | yes          |
//! | `SupportFormats` | `SupportFormats`            | no           |
//! | `NewGfx`         | `NewGfx` (success or error) | no           |
//! | undecodable      | `Error`                     | no           |

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::ProcessError;
use crate::ports::{GfxProcessor, Processed, ProcessingUnit};
use crate::protocol::{GfxRequest, GfxResponse, GfxTask, GfxTaskResult};

pub struct RequestProcessor<P> {
    processor: Arc<P>,
}

impl<P> RequestProcessor<P>
where
    P: GfxProcessor + 'static,
{
    pub fn new(processor: P) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }

    async fn run_task(&self, task: GfxTask) -> Result<GfxTaskResult, ProcessError> {
        validate_task(&task)?;

        let processor = self.processor.clone();
        let path = task.path.clone();
        let outcome = tokio::task::spawn_blocking(move || processor.process(&task))
            .await
            .map_err(|e| ProcessError::Panicked(e.to_string()))?;

        Ok(match outcome {
            Ok(images) => {
                debug!(path = %path, images = images.len(), "Task rendered");
                GfxTaskResult::success(images)
            }
            Err(text) => {
                warn!(path = %path, error = %text, "Task failed");
                GfxTaskResult::error(text)
            }
        })
    }
}

fn validate_task(task: &GfxTask) -> Result<(), ProcessError> {
    if task.path.is_empty() {
        return Err(ProcessError::InvalidRequest("empty path".to_string()));
    }
    if task.sizes.is_empty() {
        return Err(ProcessError::InvalidRequest("no output sizes".to_string()));
    }
    if let Some(size) = task.sizes.iter().find(|size| size.is_empty()) {
        return Err(ProcessError::InvalidRequest(format!(
            "zero dimension in {}x{}",
            size.width, size.height
        )));
    }
    Ok(())
}

fn encode(response: &GfxResponse) -> Result<Vec<u8>, ProcessError> {
    response
        .to_bytes()
        .map_err(|e| ProcessError::Failed(e.to_string()))
}

#[async_trait]
impl<P> ProcessingUnit for RequestProcessor<P>
where
    P: GfxProcessor + 'static,
{
    async fn process(&self, request: Vec<u8>) -> Result<Processed, ProcessError> {
        let request =
            GfxRequest::from_bytes(&request).map_err(|e| ProcessError::Decode(e.message))?;
        debug!(request = request.kind(), "Processing request");

        match request {
            GfxRequest::Hello { text } => {
                encode(&GfxResponse::Hello { text }).map(Processed::reply)
            }
            GfxRequest::Shutdown => {
                info!("Shutdown requested by client");
                encode(&GfxResponse::Shutdown).map(Processed::reply_and_stop)
            }
            GfxRequest::SupportFormats => {
                let formats = self.processor.supported_formats();
                encode(&GfxResponse::SupportFormats(formats)).map(Processed::reply)
            }
            GfxRequest::NewGfx(task) => {
                let result = self.run_task(task).await?;
                encode(&GfxResponse::NewGfx(result)).map(Processed::reply)
            }
        }
    }

    fn failure_response(&self, error: &ProcessError) -> Vec<u8> {
        GfxResponse::Error {
            message: error.to_string(),
        }
        .to_bytes()
        .unwrap_or_default()
    }
}
