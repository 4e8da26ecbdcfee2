use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Default period between liveness requests.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Periodic trigger for GET_PARAMETER / OPTIONS keepalives.
///
/// Idle until [`start`](Self::start); while idle, [`tick`](Self::tick) never
/// completes, so it can sit in a `select!` loop unconditionally.
#[derive(Debug)]
pub struct Keepalive {
    period: Duration,
    interval: Option<Interval>,
}

impl Keepalive {
    pub fn new(period: Duration) -> Self {
        Keepalive {
            period,
            interval: None,
        }
    }

    /// Start ticking, first tick one period from now. No-op if running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.interval.is_some() {
            return;
        }
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        tracing::debug!(period = ?self.period, "keepalive started");
    }

    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            tracing::debug!("keepalive stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}

impl Default for Keepalive {
    fn default() -> Self {
        Self::new(DEFAULT_KEEPALIVE_INTERVAL)
    }
}
