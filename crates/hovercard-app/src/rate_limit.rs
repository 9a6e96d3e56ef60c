//! Minimum spacing between outbound profile requests.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Default minimum gap between two dispatches.
pub const DEFAULT_MIN_GAP: Duration = Duration::from_millis(150);

/// Delays work so that consecutive dispatches are at least `min_gap` apart.
///
/// The limiter is shared by every subject: it bounds the request rate, not
/// concurrency. Waiters queue on a fair lock held until their dispatch
/// instant, so requests issued back-to-back go out in call order, `min_gap`
/// apart measured from when each one actually started.
#[derive(Debug)]
pub struct RateLimiter {
    min_gap: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_GAP)
    }
}

impl RateLimiter {
    /// Create a limiter with the given minimum gap.
    #[must_use]
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Configured minimum gap.
    #[must_use]
    pub const fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// Wait for the next free dispatch slot, then run `work`.
    pub async fn schedule<F, Fut, T>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last = self.last_dispatch.lock().await;
        if let Some(ready_at) = last.map(|prev| prev + self.min_gap) {
            let wait = ready_at.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                debug!(wait_ms = wait.as_millis(), "Delaying request to respect rate limit");
                sleep_until(ready_at).await;
            }
        }
        // actual start, so a late wakeup also delays the next caller
        *last = Some(Instant::now());
        drop(last);
        work().await
    }

    /// Instant the most recent dispatch started, if any.
    pub async fn last_dispatch(&self) -> Option<Instant> {
        *self.last_dispatch.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::task::yield_now;
    use tokio::time::advance;

    async fn stamp(log: Arc<StdMutex<Vec<(&'static str, Instant)>>>, name: &'static str) {
        if let Ok(mut log) = log.lock() {
            log.push((name, Instant::now()));
        }
    }

    fn recorded(log: &Arc<StdMutex<Vec<(&'static str, Instant)>>>) -> Vec<(&'static str, Instant)> {
        log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_calls_are_spaced_by_min_gap() {
        let limiter = RateLimiter::default();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let start = Instant::now();

        tokio::join!(
            limiter.schedule(|| stamp(Arc::clone(&log), "a")),
            limiter.schedule(|| stamp(Arc::clone(&log), "b")),
            limiter.schedule(|| stamp(Arc::clone(&log), "c")),
        );

        let log = recorded(&log);
        let names: Vec<_> = log.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(log[0].1, start);
        for pair in log.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= DEFAULT_MIN_GAP);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_limiter_dispatches_immediately() {
        let limiter = RateLimiter::default();
        let log = Arc::new(StdMutex::new(Vec::new()));

        limiter.schedule(|| stamp(Arc::clone(&log), "a")).await;
        advance(Duration::from_millis(200)).await;
        let before = Instant::now();
        limiter.schedule(|| stamp(Arc::clone(&log), "b")).await;

        assert_eq!(recorded(&log)[1].1, before);
    }

    #[tokio::test(start_paused = true)]
    async fn early_call_waits_for_remaining_gap() {
        let limiter = RateLimiter::default();
        let log = Arc::new(StdMutex::new(Vec::new()));

        limiter.schedule(|| stamp(Arc::clone(&log), "a")).await;
        advance(Duration::from_millis(50)).await;
        limiter.schedule(|| stamp(Arc::clone(&log), "b")).await;

        let log = recorded(&log);
        assert_eq!(log[1].1 - log[0].1, Duration::from_millis(150));
        assert_eq!(limiter.last_dispatch().await, Some(log[1].1));
    }

    #[tokio::test(start_paused = true)]
    async fn late_wakeup_pushes_next_dispatch_back() {
        let limiter = Arc::new(RateLimiter::default());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let start = Instant::now();
        limiter.schedule(|| stamp(Arc::clone(&log), "primer")).await;

        let first = {
            let limiter = Arc::clone(&limiter);
            let log = Arc::clone(&log);
            tokio::spawn(async move { limiter.schedule(|| stamp(log, "a")).await })
        };
        advance(Duration::from_millis(140)).await;
        // the clock jumps past the 150 ms slot before "a" gets polled again
        advance(Duration::from_millis(40)).await;
        for _ in 0..4 {
            yield_now().await;
        }
        limiter.schedule(|| stamp(Arc::clone(&log), "b")).await;
        first.await.unwrap_or_else(|err| panic!("join: {err}"));

        let log = recorded(&log);
        let names: Vec<_> = log.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["primer", "a", "b"]);
        assert!(log[1].1 - start > DEFAULT_MIN_GAP);
        assert!(log[2].1 - log[1].1 >= DEFAULT_MIN_GAP);
    }
}
