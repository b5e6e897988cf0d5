//! Timeout value shared by read, write, accept and connect.
//!
//! A `TimeoutMs` is a millisecond count where `u32::MAX` is reserved to
//! mean "wait indefinitely". It hides the platform's own timeout type from
//! every caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Deadline for a single blocking-with-deadline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeoutMs(u32);

impl TimeoutMs {
    /// Sentinel meaning "no timeout".
    pub const FOREVER: TimeoutMs = TimeoutMs(u32::MAX);

    /// Create a finite timeout. `u32::MAX` is the forever sentinel.
    pub const fn new(milliseconds: u32) -> Self {
        Self(milliseconds)
    }

    /// Wait indefinitely.
    pub const fn forever() -> Self {
        Self::FOREVER
    }

    /// Build a timeout from whole seconds, where 0 means forever.
    ///
    /// This is how keep-alive settings are expressed on the command line.
    pub fn from_secs_or_forever(seconds: u32) -> Self {
        if seconds == 0 {
            return Self::FOREVER;
        }
        Self(seconds.saturating_mul(1000).min(u32::MAX - 1))
    }

    /// Read 0 as "wait indefinitely", the convention for idle limits.
    pub const fn zero_as_forever(self) -> Self {
        if self.0 == 0 {
            Self::FOREVER
        } else {
            self
        }
    }

    pub const fn is_forever(&self) -> bool {
        self.0 == u32::MAX
    }

    /// Raw millisecond value (the sentinel included).
    pub const fn as_millis(&self) -> u32 {
        self.0
    }

    /// `None` for forever.
    pub fn as_duration(&self) -> Option<Duration> {
        if self.is_forever() {
            None
        } else {
            Some(Duration::from_millis(u64::from(self.0)))
        }
    }
}

impl From<Duration> for TimeoutMs {
    fn from(duration: Duration) -> Self {
        let millis = duration.as_millis();
        if millis >= u128::from(u32::MAX) {
            Self::FOREVER
        } else {
            Self(millis as u32)
        }
    }
}

impl fmt::Display for TimeoutMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_forever() {
            write!(f, "forever")
        } else {
            write!(f, "{}ms", self.0)
        }
    }
}

/// Drive `future` to completion, giving up once `timeout` elapses.
///
/// Returns `None` on expiry. A forever timeout never expires.
pub async fn with_timeout<F>(timeout: TimeoutMs, future: F) -> Option<F::Output>
where
    F: Future,
{
    match timeout.as_duration() {
        None => Some(future.await),
        Some(duration) => tokio::time::timeout(duration, future).await.ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forever_sentinel() {
        assert!(TimeoutMs::forever().is_forever());
        assert!(TimeoutMs::new(u32::MAX).is_forever());
        assert!(!TimeoutMs::new(0).is_forever());
        assert_eq!(TimeoutMs::forever().as_duration(), None);
    }

    #[test]
    fn test_from_secs_zero_is_forever() {
        assert!(TimeoutMs::from_secs_or_forever(0).is_forever());
        assert_eq!(
            TimeoutMs::from_secs_or_forever(60).as_duration(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_zero_as_forever() {
        assert!(TimeoutMs::new(0).zero_as_forever().is_forever());
        assert_eq!(TimeoutMs::new(250).zero_as_forever(), TimeoutMs::new(250));
        assert!(TimeoutMs::forever().zero_as_forever().is_forever());
    }

    #[test]
    fn test_huge_seconds_stay_finite() {
        let timeout = TimeoutMs::from_secs_or_forever(u32::MAX);
        assert!(!timeout.is_forever());
    }

    #[test]
    fn test_from_duration() {
        assert_eq!(TimeoutMs::from(Duration::from_millis(250)), TimeoutMs::new(250));
        assert!(TimeoutMs::from(Duration::from_secs(u64::MAX / 2)).is_forever());
    }

    #[test]
    fn test_display() {
        assert_eq!(TimeoutMs::new(1500).to_string(), "1500ms");
        assert_eq!(TimeoutMs::forever().to_string(), "forever");
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let pending = std::future::pending::<()>();
        let result = with_timeout(TimeoutMs::new(100), pending).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_with_timeout_forever_completes() {
        let result = with_timeout(TimeoutMs::forever(), async { 7 }).await;
        assert_eq!(result, Some(7));
    }
}
