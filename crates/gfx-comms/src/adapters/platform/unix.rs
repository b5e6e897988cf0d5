//! Unix domain socket channels.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use super::ListenError;
use crate::adapters::PipeEndpoint;
use crate::domain::{with_timeout, ChannelName, CommError, TimeoutMs};

pub type ServerEndpoint = PipeEndpoint<UnixStream>;
pub type ClientEndpoint = PipeEndpoint<UnixStream>;

/// Lock attempts when a releasing owner unlinks the lock file between our
/// open and our lock.
const LOCK_ATTEMPTS: usize = 3;

/// Bound, exclusively owned listening socket.
///
/// The lock file stays locked for as long as the listener lives. Both the
/// socket file and the lock file are unlinked on drop, while still locked,
/// so the next owner starts clean.
pub struct ChannelListener {
    listener: UnixListener,
    socket_path: PathBuf,
    lock_path: PathBuf,
    _lock: File,
}

impl ChannelListener {
    /// Claim `name` and start listening on it.
    ///
    /// Fails with [`CommError::AlreadyExists`] if another listener, in this
    /// process or another, owns the name.
    pub fn bind(name: &ChannelName) -> Result<Self, CommError> {
        let lock_path = name.lock_path();
        let lock = claim_lock(name, &lock_path)?;

        // With the lock held, any socket file left behind is stale.
        let socket_path = name.pipe_path();
        match fs::remove_file(&socket_path) {
            Ok(()) => debug!(path = %socket_path.display(), "Removed stale socket file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(CommError::from_io(&e)),
        }

        let listener = UnixListener::bind(&socket_path).map_err(|e| {
            warn!(path = %socket_path.display(), error = %e, "Cannot bind channel socket");
            CommError::from_io(&e)
        })?;

        info!(channel = %name, path = %socket_path.display(), "Listening");
        Ok(Self {
            listener,
            socket_path,
            lock_path,
            _lock: lock,
        })
    }

    /// Wait for one client.
    ///
    /// A connection that is already pending wins over a deadline expiring
    /// at the same instant: the accept is polled before the timer.
    pub async fn accept(&mut self, timeout: TimeoutMs) -> Result<ServerEndpoint, ListenError> {
        match with_timeout(timeout, self.listener.accept()).await {
            None => Err(ListenError::Timeout),
            Some(Ok((stream, _))) => Ok(PipeEndpoint::server(stream)),
            Some(Err(e)) => {
                debug!(error = %e, "accept failed");
                Err(ListenError::Connect(CommError::from_io(&e)))
            }
        }
    }
}

impl Drop for ChannelListener {
    fn drop(&mut self) {
        for path in [&self.socket_path, &self.lock_path] {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Cannot remove channel file");
                }
            }
        }
    }
}

/// Open and exclusively lock the channel's lock file.
fn claim_lock(name: &ChannelName, lock_path: &Path) -> Result<File, CommError> {
    for _ in 0..LOCK_ATTEMPTS {
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| {
                warn!(path = %lock_path.display(), error = %e, "Cannot open channel lock file");
                CommError::from_io(&e)
            })?;

        if let Err(e) = lock.try_lock_exclusive() {
            if is_lock_contended(&e) {
                debug!(channel = %name, "Channel name already owned");
                return Err(CommError::AlreadyExists);
            }
            return Err(CommError::from_io(&e));
        }

        // A lock on a file its previous owner already unlinked claims nothing.
        if is_same_file(&lock, lock_path) {
            return Ok(lock);
        }
        debug!(path = %lock_path.display(), "Lock file replaced while locking, retrying");
    }
    Err(CommError::AlreadyExists)
}

fn is_same_file(file: &File, path: &Path) -> bool {
    match (file.metadata(), fs::metadata(path)) {
        (Ok(open), Ok(on_disk)) => open.dev() == on_disk.dev() && open.ino() == on_disk.ino(),
        _ => false,
    }
}

fn is_lock_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Connect to the listener behind `name`.
pub async fn open_channel(name: &ChannelName) -> io::Result<ClientEndpoint> {
    UnixStream::connect(name.pipe_path())
        .await
        .map(PipeEndpoint::client)
}

/// The listener exists but its backlog is full.
pub fn is_busy(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Endpoint;
    use std::time::{Duration, Instant};

    fn unique_name(tag: &str) -> ChannelName {
        ChannelName::new(format!("gfx-unix-{}-{}", tag, std::process::id())).unwrap()
    }

    #[tokio::test]
    async fn test_second_bind_is_already_exists() {
        let name = unique_name("excl");
        let _first = ChannelListener::bind(&name).unwrap();

        let second = ChannelListener::bind(&name);
        assert_eq!(second.err(), Some(CommError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_drop_removes_socket_and_allows_rebind() {
        let name = unique_name("rebind");
        let listener = ChannelListener::bind(&name).unwrap();
        assert!(name.pipe_path().exists());
        drop(listener);
        assert!(!name.pipe_path().exists());
        assert!(!name.lock_path().exists());

        let again = ChannelListener::bind(&name);
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_stale_socket_file_is_replaced() {
        let name = unique_name("stale");
        fs::write(name.pipe_path(), b"left over").unwrap();

        let listener = ChannelListener::bind(&name);
        assert!(listener.is_ok());
    }

    #[tokio::test]
    async fn test_accept_times_out() {
        let name = unique_name("idle");
        let mut listener = ChannelListener::bind(&name).unwrap();

        let started = Instant::now();
        let result = listener.accept(TimeoutMs::new(100)).await;
        assert_eq!(result.err(), Some(ListenError::Timeout));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_accept_and_exchange() {
        let name = unique_name("accept");
        let mut listener = ChannelListener::bind(&name).unwrap();

        let mut client = open_channel(&name).await.unwrap();
        let mut server = listener.accept(TimeoutMs::new(1_000)).await.unwrap();

        assert!(client.write(b"ping", TimeoutMs::new(1_000)).await);
        let mut buf = [0u8; 4];
        assert!(server.read(&mut buf, TimeoutMs::new(1_000)).await);
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_open_missing_channel_is_not_exist() {
        let name = unique_name("missing");
        let error = open_channel(&name).await.err().unwrap();
        assert_eq!(CommError::from_io(&error), CommError::NotExist);
        assert!(!is_busy(&error));
    }

    #[test]
    fn test_unlinked_lock_file_is_not_the_same_file() {
        let name = unique_name("relink");
        let path = name.lock_path();
        let held = File::create(&path).unwrap();
        assert!(is_same_file(&held, &path));

        fs::remove_file(&path).unwrap();
        assert!(!is_same_file(&held, &path));

        File::create(&path).unwrap();
        assert!(!is_same_file(&held, &path));
        fs::remove_file(&path).unwrap();
    }
}
