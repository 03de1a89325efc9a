//! Cancellation scope for one discovery cycle.
//!
//! A [`CycleContext`] combines a [`CancellationToken`] with an optional
//! deadline. Every suspension point in the pipeline (rate limiter waits,
//! search calls, store calls, webhook deliveries) runs through
//! [`CycleContext::run`], so cancelling the token or passing the deadline
//! aborts whatever the cycle is currently waiting on.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a cycle stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The owning token was cancelled (shutdown signal, caller request).
    Shutdown,
    /// The cycle ran past its deadline.
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Shutdown => write!(f, "shutdown requested"),
            CancelCause::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Error returned when an operation is aborted by its [`CycleContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cycle cancelled: {cause}")]
pub struct Cancelled {
    pub cause: CancelCause,
}

impl Cancelled {
    #[inline]
    pub fn new(cause: CancelCause) -> Self {
        Self { cause }
    }
}

/// Cancellable, optionally deadline-bound scope for one cycle.
#[derive(Debug, Clone)]
pub struct CycleContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CycleContext {
    /// Create a context that only ends when `token` is cancelled.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Create a context that also ends `timeout` from now.
    pub fn with_timeout(token: CancellationToken, timeout: Duration) -> Self {
        Self {
            token,
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// The underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this context (and every context sharing its token).
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Return an error if the context is already cancelled or expired.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            return Err(Cancelled::new(CancelCause::Shutdown));
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Cancelled::new(CancelCause::DeadlineExceeded));
        }
        Ok(())
    }

    /// Resolve once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) -> Cancelled {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => Cancelled::new(CancelCause::Shutdown),
                    _ = tokio::time::sleep_until(deadline) => {
                        Cancelled::new(CancelCause::DeadlineExceeded)
                    }
                }
            }
            None => {
                self.token.cancelled().await;
                Cancelled::new(CancelCause::Shutdown)
            }
        }
    }

    /// Drive `fut` to completion unless the context ends first.
    ///
    /// Cancellation wins ties, so an already-cancelled context never polls
    /// `fut`.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        self.check()?;
        tokio::select! {
            biased;
            cancelled = self.cancelled() => Err(cancelled),
            output = fut => Ok(output),
        }
    }

    /// Sleep for `duration`, waking early with an error on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.run(tokio::time::sleep(duration)).await
    }
}
