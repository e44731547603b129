//! Sliding-window rate limiter for outbound provider calls.
//!
//! Keeps the start times of recent calls and allows a new call only while
//! fewer than `budget` of them fall inside the trailing `window`. Timestamps
//! older than the window are pruned lazily on every check.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::cancel::CancelToken;
use crate::errors::MarketDataError;

/// Default number of calls allowed per window.
pub const DEFAULT_RATE_BUDGET: usize = 12;

/// Default sliding window length.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window throttle shared by every caller of one client.
///
/// The check-and-record step runs under a short mutex. Waiting happens
/// outside the lock with an async sleep, after which the check is repeated,
/// so concurrent callers can never record the same free slot twice.
pub struct Throttle {
    /// Start times of calls inside the current window, oldest first.
    calls: Mutex<VecDeque<Instant>>,
    /// Maximum calls per window.
    budget: usize,
    /// Window length.
    window: Duration,
}

impl Throttle {
    /// Create a throttle allowing `budget` calls per `window`.
    ///
    /// A zero budget is raised to one so that `acquire` can always make progress.
    pub fn new(budget: usize, window: Duration) -> Self {
        let budget = budget.max(1);
        Self {
            calls: Mutex::new(VecDeque::with_capacity(budget)),
            budget,
            window,
        }
    }

    /// Lock the call window, recovering from poison if necessary.
    fn lock_calls(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.calls.lock().unwrap_or_else(|poisoned| {
            warn!("Throttle window mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn prune(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = calls.front() {
            if now.saturating_duration_since(*oldest) >= window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a call if the window has room, otherwise report how long until
    /// the oldest recorded call leaves the window.
    fn reserve(&self) -> Result<(), Duration> {
        let mut calls = self.lock_calls();
        let now = Instant::now();
        Self::prune(&mut calls, now, self.window);

        if calls.len() < self.budget {
            calls.push_back(now);
            return Ok(());
        }

        let wait = calls
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);
        Err(wait.max(Duration::from_millis(1)))
    }

    /// Wait until one more call fits in the window, then record it.
    ///
    /// There is no timeout. Callers that need a deadline should use
    /// [`acquire_cancellable`](Self::acquire_cancellable).
    pub async fn acquire(&self) {
        loop {
            match self.reserve() {
                Ok(()) => {
                    debug!("Throttle: slot acquired");
                    return;
                }
                Err(wait) => {
                    debug!("Throttle: budget of {} used, waiting {:?}", self.budget, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up with
    /// [`MarketDataError::Cancelled`] once `cancel` fires. No slot is recorded
    /// for a cancelled caller.
    pub async fn acquire_cancellable(&self, cancel: &CancelToken) -> Result<(), MarketDataError> {
        loop {
            if cancel.is_cancelled() {
                return Err(MarketDataError::Cancelled);
            }
            match self.reserve() {
                Ok(()) => {
                    debug!("Throttle: slot acquired");
                    return Ok(());
                }
                Err(wait) => {
                    debug!("Throttle: budget of {} used, waiting {:?}", self.budget, wait);
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => return Err(MarketDataError::Cancelled),
                    }
                }
            }
        }
    }

    /// Record a call only if it fits right now.
    pub fn try_acquire(&self) -> bool {
        self.reserve().is_ok()
    }

    /// Number of calls currently counted against the window.
    pub fn calls_in_window(&self) -> usize {
        let mut calls = self.lock_calls();
        Self::prune(&mut calls, Instant::now(), self.window);
        calls.len()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_BUDGET, DEFAULT_RATE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_try_acquire_up_to_budget() {
        let throttle = Throttle::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(throttle.try_acquire());
        }

        // Budget exhausted within the window
        assert!(!throttle.try_acquire());
        assert_eq!(throttle.calls_in_window(), 3);
    }

    #[test]
    fn test_old_calls_are_pruned() {
        let throttle = Throttle::new(1, Duration::from_millis(20));
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(throttle.calls_in_window(), 0);
        assert!(throttle.try_acquire());
    }

    #[test]
    fn test_zero_budget_is_raised_to_one() {
        let throttle = Throttle::new(0, Duration::from_secs(1));
        assert_eq!(throttle.budget(), 1);
        assert!(throttle.try_acquire());
    }

    #[test]
    fn test_defaults() {
        let throttle = Throttle::default();
        assert_eq!(throttle.budget(), 12);
        assert_eq!(throttle.window(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_acquire_waits_for_oldest_to_age_out() {
        let window = Duration::from_millis(150);
        let throttle = Throttle::new(2, window);

        let first = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;

        // Third call must wait until the first timestamp leaves the window
        throttle.acquire().await;
        assert!(first.elapsed() >= window);
        assert!(throttle.calls_in_window() <= 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_respect_budget() {
        let window = Duration::from_millis(100);
        let throttle = Arc::new(Throttle::new(3, window));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let throttle = Arc::clone(&throttle);
            handles.push(tokio::spawn(async move {
                throttle.acquire().await;
                Instant::now()
            }));
        }

        let mut completed = Vec::new();
        for handle in handles {
            completed.push(handle.await.unwrap());
        }
        completed.sort();

        // Calls 4..6 cannot start before the first three leave the window
        assert!(completed[3].duration_since(start) >= window);
        assert!(completed[2].duration_since(start) < window);
    }

    #[tokio::test]
    async fn test_acquire_cancellable_returns_cancelled() {
        let throttle = Throttle::new(1, Duration::from_secs(60));
        throttle.acquire().await;

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = throttle.acquire_cancellable(&cancel).await;
        assert!(matches!(result, Err(MarketDataError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(throttle.calls_in_window(), 1);
    }

    #[tokio::test]
    async fn test_acquire_cancellable_succeeds_with_room() {
        let throttle = Throttle::new(2, Duration::from_secs(60));
        let cancel = CancelToken::new();
        assert!(throttle.acquire_cancellable(&cancel).await.is_ok());
        assert_eq!(throttle.calls_in_window(), 1);
    }
}
