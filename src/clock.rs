use std::sync::RwLock;

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of the local wall-clock time. Engine functions never read the clock
/// themselves; the service passes `now` in.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Milliseconds since the Unix epoch for `now` read in the local zone.
    /// A wall-clock time skipped by a DST jump falls back to reading it as UTC.
    fn timestamp_millis(&self) -> i64 {
        let now = self.now();
        now.and_local_timezone(Local)
            .earliest()
            .map_or_else(|| now.and_utc().timestamp_millis(), |t| t.timestamp_millis())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn timestamp_millis(&self) -> i64 {
        Local::now().timestamp_millis()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn timestamp_is_local_time_since_the_epoch() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let clock = FixedClock::new(now);

        let local = Local.from_local_datetime(&now).single().unwrap();
        let offset_secs = i64::from(local.offset().local_minus_utc());

        assert_eq!(clock.timestamp_millis(), local.timestamp_millis());
        assert_eq!(
            clock.timestamp_millis(),
            now.and_utc().timestamp_millis() - offset_secs * 1000
        );
    }

    #[test]
    fn system_clock_matches_the_utc_epoch() {
        let before = Utc::now().timestamp_millis();
        let millis = SystemClock.timestamp_millis();
        assert!(millis >= before && millis <= Utc::now().timestamp_millis());
    }
}
