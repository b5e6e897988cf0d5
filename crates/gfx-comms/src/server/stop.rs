//! Shared should-stop flag.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle to the server's stop flag.
///
/// Set by a worker that served a shutdown request or by the hosting process
/// (Ctrl-C). Waiters are woken, nothing polls. Once set it stays set.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    pub fn request_stop(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.flag.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}
