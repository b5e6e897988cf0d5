//! Length-prefixed framing.

use thiserror::Error;
use tracing::trace;

use crate::domain::{with_timeout, TimeoutMs};
use crate::ports::Endpoint;

/// Size of the little-endian length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest refused payload a reader skips so the sender can still be
/// answered. Anything bigger is left unread.
pub const MAX_DISCARD_BYTES: u64 = 256 * 1024 * 1024;

const DISCARD_CHUNK: usize = 64 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The endpoint failed, timed out or the peer went away.
    #[error("connection closed during {0}")]
    Closed(&'static str),

    /// Announced or outgoing payload exceeds the allowed size.
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    TooLarge { len: u64, max: u32 },
}

/// Write one frame: header and payload in a single transfer.
pub async fn write_frame<E>(
    endpoint: &mut E,
    payload: &[u8],
    timeout: TimeoutMs,
) -> Result<(), FrameError>
where
    E: Endpoint + ?Sized,
{
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        len: payload.len() as u64,
        max: u32::MAX,
    })?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);

    if !endpoint.write(&frame, timeout).await {
        return Err(FrameError::Closed("write"));
    }
    trace!(endpoint = endpoint.name(), len, "frame written");
    Ok(())
}

/// Read one frame, refusing payloads above `max_len` before allocating.
pub async fn read_frame<E>(
    endpoint: &mut E,
    max_len: u32,
    timeout: TimeoutMs,
) -> Result<Vec<u8>, FrameError>
where
    E: Endpoint + ?Sized,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    if !endpoint.read(&mut header, timeout).await {
        return Err(FrameError::Closed("read header"));
    }

    let len = u32::from_le_bytes(header);
    if len > max_len {
        return Err(FrameError::TooLarge {
            len: u64::from(len),
            max: max_len,
        });
    }

    let mut payload = vec![0u8; len as usize];
    if !endpoint.read(&mut payload, timeout).await {
        return Err(FrameError::Closed("read payload"));
    }
    trace!(endpoint = endpoint.name(), len, "frame read");
    Ok(payload)
}

/// Skip the `len` payload bytes of a frame refused by [`read_frame`].
///
/// The whole skip, not each chunk, is bounded by `timeout`. Returns `false`
/// if `len` exceeds [`MAX_DISCARD_BYTES`], the peer stopped sending, or the
/// deadline passed.
pub async fn discard_payload<E>(endpoint: &mut E, len: u64, timeout: TimeoutMs) -> bool
where
    E: Endpoint + ?Sized,
{
    if len > MAX_DISCARD_BYTES {
        return false;
    }

    let skip = async {
        let mut chunk = vec![0u8; DISCARD_CHUNK.min(len as usize)];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            if !endpoint.read(&mut chunk[..n], timeout).await {
                return false;
            }
            remaining -= n as u64;
        }
        true
    };

    let skipped = with_timeout(timeout, skip).await.unwrap_or(false);
    trace!(len, skipped, "refused payload");
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::PipeEndpoint;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_frame_layout_is_le_length_then_payload() {
        let (local, mut remote) = duplex(64);
        let mut endpoint = PipeEndpoint::client(local);

        write_frame(&mut endpoint, b"abc", TimeoutMs::new(1_000))
            .await
            .unwrap();

        let mut raw = [0u8; 7];
        remote.read_exact(&mut raw).await.unwrap();
        assert_eq!(raw, [3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[tokio::test]
    async fn test_read_frame_returns_payload() {
        let (local, remote) = duplex(1024);
        let mut reader = PipeEndpoint::server(local);
        let mut writer = PipeEndpoint::client(remote);

        let payload: Vec<u8> = (0..=255u8).collect();
        write_frame(&mut writer, &payload, TimeoutMs::new(1_000))
            .await
            .unwrap();

        let received = read_frame(&mut reader, 1024, TimeoutMs::new(1_000))
            .await
            .unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let (local, remote) = duplex(64);
        let mut reader = PipeEndpoint::server(local);
        let mut writer = PipeEndpoint::client(remote);

        write_frame(&mut writer, &[], TimeoutMs::new(1_000))
            .await
            .unwrap();
        let received = read_frame(&mut reader, 16, TimeoutMs::new(1_000))
            .await
            .unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_frame_refused() {
        let (local, mut remote) = duplex(64);
        let mut reader = PipeEndpoint::server(local);

        remote.write_all(&u32::MAX.to_le_bytes()).await.unwrap();

        let result = read_frame(&mut reader, 1024, TimeoutMs::new(1_000)).await;
        assert_eq!(
            result,
            Err(FrameError::TooLarge {
                len: u64::from(u32::MAX),
                max: 1024
            })
        );
    }

    #[tokio::test]
    async fn test_truncated_payload_is_closed() {
        let (local, mut remote) = duplex(64);
        let mut reader = PipeEndpoint::server(local);

        remote.write_all(&10u32.to_le_bytes()).await.unwrap();
        remote.write_all(b"short").await.unwrap();
        drop(remote);

        let result = read_frame(&mut reader, 1024, TimeoutMs::new(1_000)).await;
        assert_eq!(result, Err(FrameError::Closed("read payload")));
    }

    #[tokio::test]
    async fn test_no_header_is_closed() {
        let (local, remote) = duplex(64);
        drop(remote);
        let mut reader = PipeEndpoint::server(local);

        let result = read_frame(&mut reader, 1024, TimeoutMs::new(1_000)).await;
        assert_eq!(result, Err(FrameError::Closed("read header")));
    }

    #[tokio::test]
    async fn test_refused_payload_is_skipped() {
        let (local, remote) = duplex(256 * 1024);
        let mut reader = PipeEndpoint::server(local);
        let mut writer = PipeEndpoint::client(remote);

        let big = vec![9u8; 200 * 1024];
        write_frame(&mut writer, &big, TimeoutMs::new(1_000))
            .await
            .unwrap();
        write_frame(&mut writer, b"next", TimeoutMs::new(1_000))
            .await
            .unwrap();

        let Err(FrameError::TooLarge { len, .. }) =
            read_frame(&mut reader, 1024, TimeoutMs::new(1_000)).await
        else {
            panic!("oversized frame was accepted");
        };
        assert!(discard_payload(&mut reader, len, TimeoutMs::new(1_000)).await);

        let next = read_frame(&mut reader, 1024, TimeoutMs::new(1_000))
            .await
            .unwrap();
        assert_eq!(next, b"next");
    }

    #[tokio::test]
    async fn test_skip_fails_when_peer_stops_short() {
        let (local, mut remote) = duplex(64);
        let mut reader = PipeEndpoint::server(local);

        remote.write_all(&[1u8; 10]).await.unwrap();
        drop(remote);

        assert!(!discard_payload(&mut reader, 100, TimeoutMs::new(1_000)).await);
    }

    #[tokio::test]
    async fn test_skip_refuses_huge_payload() {
        let (local, _remote) = duplex(64);
        let mut reader = PipeEndpoint::server(local);

        assert!(!discard_payload(&mut reader, MAX_DISCARD_BYTES + 1, TimeoutMs::new(10)).await);
    }
}
