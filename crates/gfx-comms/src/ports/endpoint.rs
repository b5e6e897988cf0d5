//! Duplex endpoint port.

use async_trait::async_trait;

use crate::domain::TimeoutMs;

/// One established duplex connection over a channel.
///
/// `read` and `write` move exactly `buf.len()` bytes or report failure. A
/// short transfer, an I/O error, a peer disconnect and an expired deadline
/// all look the same to the caller: `false`. No partial byte count is
/// surfaced and nothing is retried here.
///
/// A timeout does not poison the endpoint by itself, but the bytes of an
/// interrupted transfer may have been partly consumed, so callers discard an
/// endpoint after any failed exchange.
#[async_trait]
pub trait Endpoint: Send {
    /// Fill `buf` completely.
    async fn read(&mut self, buf: &mut [u8], timeout: TimeoutMs) -> bool;

    /// Send all of `buf`.
    async fn write(&mut self, buf: &[u8], timeout: TimeoutMs) -> bool;

    /// Flush pending output and signal end-of-stream to the peer.
    ///
    /// Dropping the endpoint releases the OS resource as well; `close` only
    /// makes the shutdown orderly.
    async fn close(&mut self);

    /// Label used in logs ("client", "server").
    fn name(&self) -> &str;
}

#[async_trait]
impl<E: Endpoint + ?Sized> Endpoint for Box<E> {
    async fn read(&mut self, buf: &mut [u8], timeout: TimeoutMs) -> bool {
        (**self).read(buf, timeout).await
    }

    async fn write(&mut self, buf: &[u8], timeout: TimeoutMs) -> bool {
        (**self).write(buf, timeout).await
    }

    async fn close(&mut self) {
        (**self).close().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
