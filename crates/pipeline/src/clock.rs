//! Injectable time source.
//!
//! Quota windows and cache expiry are both defined in terms of "now", so
//! the pipeline takes its clock as a dependency instead of reading ambient
//! process time. Production uses [`SystemClock`]; tests pin and advance a
//! [`ManualClock`].

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, Utc};

use ladle_core::types::Timestamp;

/// A source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A manually-advanced clock for deterministic tests.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Pin the clock to an exact instant.
    pub fn set(&self, to: Timestamp) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The first instant of the day after `now` (UTC midnight). Guest counters
/// and quota denials expire here.
pub fn start_of_next_day(now: Timestamp) -> Timestamp {
    let next = now.date_naive() + Duration::days(1);
    next.and_hms_opt(0, 0, 0)
        .expect("midnight always exists")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn start_of_next_day_is_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let rollover = start_of_next_day(now);
        assert_eq!(rollover, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), start + Duration::hours(3));
    }
}
