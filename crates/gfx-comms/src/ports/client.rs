//! Client connection port.

use async_trait::async_trait;

use crate::domain::CommError;
use crate::ports::Endpoint;

/// Opens a connection to the worker.
#[async_trait]
pub trait CommunicationsClient: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Endpoint>, CommError>;
}
