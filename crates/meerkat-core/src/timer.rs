use std::time::{Duration, Instant};

/// Intervals at or below this length are re-armed as-is.
const CORRECTION_THRESHOLD: Duration = Duration::from_secs(1);

/// Computes the delay until the next periodic cycle.
///
/// The delay is measured from the previous fire time rather than from the end of
/// the cycle, so the cost of running checks does not accumulate as drift.
#[derive(Debug, Clone)]
pub struct DriftTimer {
    interval: Duration,
    last_fire: Option<Instant>,
}

impl DriftTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fire: None,
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Takes effect the next time the timer is armed.
    #[inline]
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    #[inline]
    pub fn last_fire(&self) -> Option<Instant> {
        self.last_fire
    }

    pub fn record_fire(&mut self, at: Instant) {
        self.last_fire = Some(at);
    }

    /// Forgets the previous fire so the next arm uses the full interval.
    pub fn reset(&mut self) {
        self.last_fire = None;
    }

    /// Delay to arm the timer with at `now`.
    ///
    /// Never negative: a cycle that overran the interval fires immediately.
    pub fn next_delay(&self, now: Instant) -> Duration {
        match self.last_fire {
            Some(fired) if self.interval > CORRECTION_THRESHOLD => self
                .interval
                .saturating_sub(now.saturating_duration_since(fired)),
            _ => self.interval,
        }
    }
}
