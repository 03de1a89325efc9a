//! Periodic cycle scheduling for the daemon.

use std::future::Future;
use std::time::Duration;

use mirrorbot::CycleContext;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Schedule {
    pub interval: Duration,
    pub cycle_timeout: Duration,
    pub run_on_start: bool,
}

impl Schedule {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.interval(),
            cycle_timeout: config.cycle_timeout(),
            run_on_start: config.schedule.run_on_start,
        }
    }
}

/// Run `run_cycle` every `schedule.interval` until `shutdown` is cancelled.
///
/// Cycles never overlap. A cycle that overruns its interval delays the next
/// tick rather than triggering a burst of catch-up cycles. Each cycle gets a
/// child of `shutdown` bounded by the cycle timeout.
pub(crate) async fn run_scheduled<F, Fut>(
    schedule: Schedule,
    shutdown: &CancellationToken,
    mut run_cycle: F,
) where
    F: FnMut(CycleContext) -> Fut,
    Fut: Future<Output = ()>,
{
    let first = if schedule.run_on_start {
        Instant::now()
    } else {
        Instant::now() + schedule.interval
    };
    let mut ticker = interval_at(first, schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let ctx = CycleContext::with_timeout(shutdown.child_token(), schedule.cycle_timeout);
        run_cycle(ctx).await;

        if shutdown.is_cancelled() {
            break;
        }
    }

    tracing::info!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schedule(run_on_start: bool) -> Schedule {
        Schedule {
            interval: Duration::from_secs(60),
            cycle_timeout: Duration::from_secs(30),
            run_on_start,
        }
    }

    fn cancel_after(token: &CancellationToken, after: Duration) {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            token.cancel();
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let shutdown = CancellationToken::new();
        let count = Arc::new(AtomicUsize::new(0));
        cancel_after(&shutdown, Duration::from_secs(150));

        let counter = Arc::clone(&count);
        run_scheduled(schedule(true), &shutdown, move |_ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        // t = 0, 60, 120
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_one_interval_when_not_running_on_start() {
        let shutdown = CancellationToken::new();
        let count = Arc::new(AtomicUsize::new(0));
        cancel_after(&shutdown, Duration::from_secs(150));

        let counter = Arc::clone(&count);
        run_scheduled(schedule(false), &shutdown, move |_ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        // t = 60, 120
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_the_running_cycle() {
        let shutdown = CancellationToken::new();
        let observed = Arc::new(AtomicUsize::new(0));
        cancel_after(&shutdown, Duration::from_secs(10));

        let seen = Arc::clone(&observed);
        run_scheduled(schedule(true), &shutdown, move |ctx| {
            let seen = Arc::clone(&seen);
            async move {
                if ctx.sleep(Duration::from_secs(25)).await.is_err() {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            }
        })
        .await;

        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_timeout_bounds_each_cycle() {
        let shutdown = CancellationToken::new();
        let timed_out = Arc::new(AtomicUsize::new(0));
        cancel_after(&shutdown, Duration::from_secs(90));

        let counter = Arc::clone(&timed_out);
        run_scheduled(schedule(true), &shutdown, move |ctx| {
            let counter = Arc::clone(&counter);
            async move {
                if ctx.sleep(Duration::from_secs(45)).await.is_err() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }
        })
        .await;

        // Cycles at t = 0 and t = 60 both hit the 30s timeout.
        assert_eq!(timed_out.load(Ordering::SeqCst), 2);
    }
}
