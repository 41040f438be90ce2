//! Cancellation context handed to a server's graceful stop.
//!
//! A context fires either when its deadline elapses or when it is cancelled
//! explicitly. The deadline is checked lazily, so an unfired context holds no
//! timer and nothing needs releasing when it is dropped.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The shutdown deadline elapsed before in-flight work finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("shutdown deadline exceeded")]
pub struct DeadlineExceeded;

/// Why a context has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),

    #[error("shutdown context cancelled")]
    Cancelled,
}

/// Cancellation context bounding a graceful stop.
#[derive(Debug, Clone)]
pub struct ShutdownContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ShutdownContext {
    /// A context that only fires when cancelled explicitly.
    pub fn unbounded() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context that fires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Bounded by `timeout` when given, unbounded otherwise.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) => Self::with_timeout(timeout),
            None => Self::unbounded(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Cancel the context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline_elapsed()
    }

    /// Reports why the context has fired, if it has. An elapsed deadline
    /// takes precedence over an explicit cancel.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.deadline_elapsed() {
            Err(DeadlineExceeded.into())
        } else if self.token.is_cancelled() {
            Err(ContextError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the context is cancelled or its deadline elapses.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    fn deadline_elapsed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl Default for ShutdownContext {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_at_deadline() {
        let ctx = ShutdownContext::with_timeout(Duration::from_millis(20));
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.remaining(), Some(Duration::from_millis(20)));

        let start = Instant::now();
        ctx.cancelled().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded(DeadlineExceeded)));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fire_before_deadline() {
        let ctx = ShutdownContext::with_timeout(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.check(), Ok(()));
    }

    #[tokio::test]
    async fn explicit_cancel_reaches_clones() {
        let ctx = ShutdownContext::unbounded();
        let clone = ctx.clone();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());

        ctx.cancel();
        clone.cancelled().await;
        assert!(clone.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_cancel_is_not_a_deadline() {
        let unbounded = ShutdownContext::unbounded();
        unbounded.cancel();
        assert_eq!(unbounded.check(), Err(ContextError::Cancelled));

        let bounded = ShutdownContext::with_timeout(Duration::from_millis(20));
        bounded.cancel();
        assert_eq!(bounded.check(), Err(ContextError::Cancelled));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(bounded.check(), Err(ContextError::DeadlineExceeded(DeadlineExceeded)));
    }

    #[test]
    fn from_timeout_picks_shape() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let _guard = runtime.enter();
        assert!(ShutdownContext::from_timeout(None).deadline().is_none());
        assert!(ShutdownContext::from_timeout(Some(Duration::from_secs(1)))
            .deadline()
            .is_some());
    }
}
