//! Time sources
//!
//! The pipeline works in [`AbsoluteTime`]; a [`Clock`] maps "now" onto that
//! scale. [`MonotonicClock`] follows tokio's clock, so paused-time tests
//! drive it; [`ManualClock`] is stepped by hand.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::hid::AbsoluteTime;

/// Source of the current pipeline time
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> AbsoluteTime;
}

/// Monotonic clock anchored at a start time
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
    start: AbsoluteTime,
}

impl MonotonicClock {
    /// A clock reading zero now
    pub fn new() -> Self {
        Self::starting_at(AbsoluteTime::ZERO)
    }

    /// A clock reading `start` now
    pub fn starting_at(start: AbsoluteTime) -> Self {
        Self {
            origin: Instant::now(),
            start,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> AbsoluteTime {
        self.start + self.origin.elapsed()
    }
}

/// Hand-stepped clock, shared between clones
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<AbsoluteTime>>,
}

impl ManualClock {
    /// A clock reading `now`
    pub fn new(now: AbsoluteTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Jump to `now`
    pub fn set(&self, now: AbsoluteTime) {
        *self.now.lock() = now;
    }

    /// Move forward
    pub fn advance(&self, duration: std::time::Duration) {
        *self.now.lock() += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> AbsoluteTime {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_clock_follows_tokio_time() {
        let clock = MonotonicClock::starting_at(AbsoluteTime::from_millis(100));
        assert_eq!(clock.now(), AbsoluteTime::from_millis(100));

        tokio::time::advance(Duration::from_millis(25)).await;
        assert_eq!(clock.now(), AbsoluteTime::from_millis(125));
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(AbsoluteTime::from_millis(1));
        let other = clock.clone();

        clock.advance(Duration::from_millis(4));
        assert_eq!(other.now(), AbsoluteTime::from_millis(5));

        other.set(AbsoluteTime::ZERO);
        assert_eq!(clock.now(), AbsoluteTime::ZERO);
    }
}
