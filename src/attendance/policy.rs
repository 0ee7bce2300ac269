use chrono::{Duration, NaiveTime};

/// Local time-of-day cutoffs that drive status derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
    /// Check-ins strictly after this time are `late`.
    pub expected_start: NaiveTime,
    /// Check-outs before this time turn the day into a `half-day`.
    pub half_day_cutoff: NaiveTime,
    /// The absence sweep refuses to run for today before this time.
    pub absence_cutoff: NaiveTime,
}

fn at_hour(hour: i64) -> NaiveTime {
    NaiveTime::MIN + Duration::hours(hour)
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            expected_start: at_hour(10),
            half_day_cutoff: at_hour(14),
            absence_cutoff: at_hour(12),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cutoffs() {
        let policy = AttendancePolicy::default();
        assert_eq!(policy.expected_start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(policy.half_day_cutoff, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(policy.absence_cutoff, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }
}
