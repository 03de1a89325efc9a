//! Fixed-window token bucket that gates outbound search calls.
//!
//! The bucket holds at most `capacity` tokens. A background task started by
//! [`TokenBucket::start`] resets the counter to `capacity` every `period`;
//! unused tokens are not carried over. [`TokenBucket::take`] polls the
//! counter and sleeps [`POLL_INTERVAL`] between attempts until a token is
//! free or the cycle context ends.
//!
//! # Example
//!
//! ```ignore
//! use mirrorbot::rate_limit::TokenBucket;
//!
//! // GitHub allows 30 search calls per minute; stay below it.
//! let bucket = TokenBucket::new(25, Duration::from_secs(60))?;
//! bucket.start();
//!
//! bucket.take(&ctx).await?;
//! client.search_repositories(query, page).await?;
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::context::{Cancelled, CycleContext};

/// Delay between acquisition attempts while the bucket is empty.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of search calls per window (GitHub allows 30/min).
pub const DEFAULT_CAPACITY: u32 = 25;

/// Default refill window.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Invalid bucket parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("rate limit capacity must be at least 1")]
    ZeroCapacity,

    #[error("rate limit period must be greater than zero")]
    ZeroPeriod,
}

#[derive(Debug)]
struct BucketState {
    capacity: u32,
    tokens: Mutex<u32>,
}

impl BucketState {
    fn lock(&self) -> MutexGuard<'_, u32> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn refill(&self) {
        *self.lock() = self.capacity;
    }
}

/// Fixed-capacity token bucket with a periodic full refill.
///
/// Each instance owns its refill task; there is no process-wide limiter, so
/// independent pipelines (and tests) never share tokens.
#[derive(Debug)]
pub struct TokenBucket {
    state: Arc<BucketState>,
    period: Duration,
    refill_stop: Mutex<Option<CancellationToken>>,
}

impl TokenBucket {
    /// Create a full bucket. The refill loop does not run until [`start`](Self::start).
    pub fn new(capacity: u32, period: Duration) -> Result<Self, RateLimitError> {
        if capacity == 0 {
            return Err(RateLimitError::ZeroCapacity);
        }
        if period.is_zero() {
            return Err(RateLimitError::ZeroPeriod);
        }

        Ok(Self {
            state: Arc::new(BucketState {
                capacity,
                tokens: Mutex::new(capacity),
            }),
            period,
            refill_stop: Mutex::new(None),
        })
    }

    pub fn capacity(&self) -> u32 {
        self.state.capacity
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tokens currently available.
    pub fn available(&self) -> u32 {
        *self.state.lock()
    }

    /// Spawn the refill loop on the current tokio runtime.
    ///
    /// Calling `start` on a running bucket is a no-op.
    pub fn start(&self) {
        let mut guard = self.refill_stop.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return;
        }

        let stop = CancellationToken::new();
        let state = Arc::clone(&self.state);
        let period = self.period;
        let task_stop = stop.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_stop.cancelled() => break,
                    _ = ticker.tick() => {
                        state.refill();
                        tracing::trace!(capacity = state.capacity, "Rate limit window reset");
                    }
                }
            }
        });

        *guard = Some(stop);
    }

    /// Stop the refill loop. Tokens left in the bucket stay usable, but no
    /// new ones arrive afterwards.
    pub fn stop(&self) {
        let stop = self
            .refill_stop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(stop) = stop {
            stop.cancel();
        }
    }

    /// Take a token if one is available, without waiting.
    pub fn try_take(&self) -> bool {
        let mut tokens = self.state.lock();
        if *tokens > 0 {
            *tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Wait for a token, polling every [`POLL_INTERVAL`].
    ///
    /// Fails with the context's [`Cancelled`] error if the cycle ends first.
    /// Waiters are not queued fairly; the pipeline is the only caller.
    pub async fn take(&self, ctx: &CycleContext) -> Result<(), Cancelled> {
        loop {
            ctx.check()?;
            if self.try_take() {
                return Ok(());
            }
            ctx.sleep(POLL_INTERVAL).await?;
        }
    }
}

impl Drop for TokenBucket {
    fn drop(&mut self) {
        self.stop();
    }
}
