//! Bounded retry with exponential backoff.
//!
//! The backoff schedule comes from `backon`'s [`ExponentialBuilder`]; the loop
//! itself lives here so a server-provided delay (HTTP 429 with
//! `Retry-After`) can replace the next scheduled delay, and so every sleep
//! honours the cycle's [`CycleContext`].

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use thiserror::Error;

use crate::context::{Cancelled, CycleContext};

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 4;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Set the retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Retry after the next delay from the backoff schedule.
    Retry,
    /// Retry after exactly this delay (server-specified).
    RetryAfter(Duration),
    /// Give up immediately; the error is permanent.
    Fail,
}

/// Terminal outcome of [`with_retry`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("{0}")]
    Permanent(E),
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// retries.
///
/// `classify` maps each error to a [`RetryAction`]. A `RetryAfter` delay
/// replaces the scheduled backoff for that attempt but still counts against
/// the retry bound.
pub async fn with_retry<T, E, F, Fut, C>(
    ctx: &CycleContext,
    config: &RetryConfig,
    mut operation: F,
    classify: C,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    C: Fn(&E) -> RetryAction,
{
    let mut backoff = config.clone().into_backoff().build();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let err = match ctx.run(operation()).await? {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let action = classify(&err);
        if action == RetryAction::Fail {
            return Err(RetryError::Permanent(err));
        }

        let Some(scheduled) = backoff.next() else {
            return Err(RetryError::Exhausted {
                attempts,
                last: err,
            });
        };

        let delay = match action {
            RetryAction::RetryAfter(delay) => delay,
            _ => scheduled,
        };

        tracing::debug!(attempt = attempts, ?delay, error = %err, "Retrying after failure");
        ctx.sleep(delay).await?;
    }
}
