//! Bounded, fixed-delay reconnect policy and its timer.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep_until};

/// Reconnect budget for one session.
///
/// `attempt` counts reconnects scheduled since the last successful open.
/// A reconnect may be scheduled only while `attempt < max_attempts`; the
/// counter increments as it is scheduled and resets on every open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
}

impl ReconnectPolicy {
    /// Creates a policy with a fresh budget.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            delay,
        }
    }

    /// Reconnects scheduled since the last successful open.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Size of the budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fixed delay applied before each reconnect.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns `true` while another reconnect may be scheduled.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Consumes one attempt, returning the delay to wait, or `None` once
    /// the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.can_retry() {
            return None;
        }
        self.attempt += 1;
        Some(self.delay)
    }

    /// Restores the full budget after a successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_MAX_RECONNECT_ATTEMPTS,
            crate::config::DEFAULT_RECONNECT_DELAY,
        )
    }
}

/// The single pending-reconnect timer of a session.
///
/// Scheduling replaces any pending deadline; [`ReconnectTimer::fired`]
/// never resolves while nothing is scheduled.
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ReconnectTimer {
    /// Arms the timer to fire after `delay`, replacing any pending deadline.
    pub fn schedule(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(sleep_until(Instant::now() + delay)));
    }

    /// Disarms the timer.
    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    /// Returns `true` while a reconnect is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    /// Completes when the pending deadline passes, then disarms.
    ///
    /// Cancel-safe: dropping the future leaves the deadline armed.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn budget_allows_exactly_max_attempts() {
        let mut policy = ReconnectPolicy::new(5, Duration::from_millis(1000));
        let delays: Vec<_> = std::iter::from_fn(|| policy.next_delay()).collect();
        assert_eq!(delays, vec![Duration::from_millis(1000); 5]);
        assert_eq!(policy.attempt(), 5);
        assert!(!policy.can_retry());
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempt(), 5);
    }

    #[test]
    fn reset_restores_budget() {
        let mut policy = ReconnectPolicy::default();
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.attempt(), 2);
        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert!(policy.can_retry());
    }

    #[test]
    fn zero_budget_never_retries() {
        let mut policy = ReconnectPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn unarmed_timer_is_pending() {
        let mut timer = ReconnectTimer::default();
        let mut fired = tokio_test::task::spawn(timer.fired());
        tokio_test::assert_pending!(fired.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_delay() {
        let mut timer = ReconnectTimer::default();
        let start = Instant::now();
        timer.schedule(Duration::from_millis(1000));
        assert!(timer.is_pending());
        timer.fired().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut timer = ReconnectTimer::default();
        timer.schedule(Duration::from_millis(1000));
        timer.cancel();
        let outcome = tokio::time::timeout(Duration::from_secs(10), timer.fired()).await;
        assert!(outcome.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_deadline() {
        let mut timer = ReconnectTimer::default();
        let start = Instant::now();
        timer.schedule(Duration::from_millis(100));
        timer.schedule(Duration::from_millis(500));
        timer.fired().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
