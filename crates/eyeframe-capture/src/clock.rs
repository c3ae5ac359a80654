use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

/// Source of capture timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock that advances by a fixed step on every reading.
#[derive(Debug)]
pub struct ManualClock {
    next_ms: AtomicI64,
    step_ms: i64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step_ms: i64) -> Self {
        Self {
            next_ms: AtomicI64::new(start.timestamp_millis()),
            step_ms,
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.next_ms.fetch_add(self.step_ms, Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_steps_forward() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start, 500);
        let first = clock.now();
        let second = clock.now();
        assert_eq!(first, start);
        assert_eq!((second - first).num_milliseconds(), 500);
    }
}
