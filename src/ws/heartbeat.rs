//! Keepalive scheduler.
//!
//! While the session is connected a [`Heartbeat`] ticks once per period;
//! each tick sends one [`Envelope::ping`]. The first tick comes one full
//! period after [`Heartbeat::start`]. Stopping drops the interval, so no
//! tick can be observed after a close.

use std::future::pending;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use super::messages::Envelope;

/// At most one keepalive interval per session.
#[derive(Debug)]
pub struct Heartbeat {
    period: Duration,
    interval: Option<Interval>,
}

impl Heartbeat {
    /// Creates a stopped heartbeat with the given period.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Starts ticking, replacing any running interval.
    pub fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    /// Stops ticking.
    pub fn stop(&mut self) {
        self.interval = None;
    }

    /// Returns `true` while the interval is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Completes on the next tick and returns the ping to send.
    ///
    /// Never resolves while stopped.
    pub async fn tick(&mut self) -> Envelope {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
                Envelope::ping()
            }
            None => pending().await,
        }
    }
}
