//! Request-scoped deadline and cancellation.
//!
//! A [`SubmitContext`] is created by the caller of a submission and passed
//! explicitly to every downstream call. It carries an optional deadline and a
//! cancellation signal shared with the [`CancelHandle`] that created it.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Deadline and cancellation token threaded through a submission.
#[derive(Debug, Clone)]
pub struct SubmitContext {
    deadline: Option<Instant>,
    cancelled: watch::Receiver<bool>,
}

/// Cancels every context derived from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl SubmitContext {
    /// Creates a cancellable context with no deadline.
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancelled: rx,
            },
            CancelHandle { tx },
        )
    }

    /// Creates a context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            deadline: None,
            cancelled: rx,
        }
    }

    /// Creates an uncancellable context that expires after `timeout`.
    ///
    /// Used for work that must outlive the caller, such as compensation.
    pub fn detached(timeout: Duration) -> Self {
        Self::background().with_timeout(timeout)
    }

    /// Returns a child context that expires after `timeout` or at the parent
    /// deadline, whichever comes first. Cancellation is shared with the parent.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a child context whose deadline is the earlier of `deadline`
    /// and the parent deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            deadline: Some(deadline),
            cancelled: self.cancelled.clone(),
        }
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left before the deadline. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns true if the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Fails fast if the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves when the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> ContextError {
        let mut rx = self.cancelled.clone();
        let cancelled = async move {
            // A dropped handle can no longer cancel.
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => ContextError::Cancelled,
            () = expired => ContextError::DeadlineExceeded,
        }
    }

    /// Runs `fut` until it completes or the context is done.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }
}

impl Default for SubmitContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_context_is_always_live() {
        let ctx = SubmitContext::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_is_observed_by_children() {
        let (ctx, handle) = SubmitContext::new();
        let child = ctx.with_timeout(Duration::from_secs(60));

        handle.cancel();

        assert!(handle.is_cancelled());
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
        assert_eq!(child.check(), Err(ContextError::Cancelled));
        assert_eq!(child.done().await, ContextError::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let ctx = SubmitContext::background().with_timeout(Duration::from_millis(50));
        assert!(ctx.check().is_ok());

        tokio::time::advance(Duration::from_millis(51)).await;

        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_cannot_extend_parent_deadline() {
        let parent = SubmitContext::background().with_timeout(Duration::from_millis(100));
        let child = parent.with_timeout(Duration::from_secs(10));

        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_deadline() {
        let ctx = SubmitContext::background().with_timeout(Duration::from_millis(10));

        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(1)))
            .await;

        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_run_returns_output() {
        let ctx = SubmitContext::background();
        let result = ctx.run(async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_detached_ignores_parent_cancellation() {
        let (_ctx, handle) = SubmitContext::new();
        handle.cancel();

        let detached = SubmitContext::detached(Duration::from_secs(5));
        assert!(detached.check().is_ok());
    }
}
