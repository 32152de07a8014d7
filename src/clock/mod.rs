//! Injectable wall-clock seam.
//!
//! Window boundaries depend on the current time; routing every read through
//! [`TimeSource`] keeps the pipeline deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current unix timestamp in whole seconds.
pub trait TimeSource: Send + Sync {
    fn unix_now(&self) -> u64;
}

/// Production clock reading the system time.
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn unix_now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Settable clock for tests.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, ts: u64) {
        self.now.store(ts, Ordering::Relaxed);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::Relaxed);
    }
}

impl TimeSource for ManualClock {
    fn unix_now(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.unix_now(), 100);

        clock.advance(10);
        assert_eq!(clock.unix_now(), 110);

        clock.set(42);
        assert_eq!(clock.unix_now(), 42);
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.unix_now() > 1_500_000_000);
    }
}
