//! Aggregation window lifecycle.

/// One open aggregation period. `end_ts` is the time-based flush deadline,
/// always computed as `start_ts + interval` rather than read from the clock
/// at flush time.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub start_ts: u64,
    pub end_ts: u64,
    interval: u64,
}

impl Window {
    pub fn starting_at(now: u64, interval: u64) -> Self {
        Self {
            start_ts: now,
            end_ts: now + interval,
            interval,
        }
    }

    /// Whether the time-based flush trigger has fired.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.end_ts
    }

    /// Opens the next window at the flush instant.
    pub fn reset(&mut self, now: u64) {
        self.start_ts = now;
        self.end_ts = now + self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_is_start_plus_interval() {
        let window = Window::starting_at(1_000, 10);
        assert_eq!(window.start_ts, 1_000);
        assert_eq!(window.end_ts, 1_010);
    }

    #[test]
    fn test_expiry_is_inclusive_of_deadline() {
        let window = Window::starting_at(1_000, 10);
        assert!(!window.is_expired(1_009));
        assert!(window.is_expired(1_010));
        assert!(window.is_expired(1_500));
    }

    #[test]
    fn test_reset_reopens_from_flush_instant() {
        let mut window = Window::starting_at(1_000, 10);
        window.reset(1_017);
        assert_eq!(window.start_ts, 1_017);
        assert_eq!(window.end_ts, 1_027);
    }
}
