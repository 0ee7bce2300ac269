//! Pure status derivation for a single (user, day) attendance record.
//!
//! Every function takes `now` explicitly and never touches storage; the
//! service layer decides what to read and write.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::attendance::error::AttendanceError;
use crate::attendance::policy::AttendancePolicy;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

/// Whether a checkout completed the working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCompletion {
    FullDay,
    HalfDay,
}

/// Whether the absence sweep may run for a date at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepWindow {
    Open,
    /// The date is today and the absence cutoff has not passed yet.
    TooEarly,
}

/// What the absence sweep does to one employee's day.
#[derive(Debug, Clone, PartialEq)]
pub enum AbsenceOutcome {
    /// Sweep window not open yet, nothing to do.
    Deferred,
    /// A real check-in exists and always wins over the sweep.
    CheckedIn,
    /// Already recorded as absent; no write needed.
    AlreadyAbsent,
    /// Write this record (new row, or existing row without check-in).
    Mark(AttendanceRecord),
}

/// `late` when the time of day is strictly after `expected_start`, else `present`.
pub fn derive_check_in_status(
    check_in: NaiveDateTime,
    expected_start: NaiveTime,
) -> AttendanceStatus {
    if check_in.time() > expected_start {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

/// A missing checkout counts as an incomplete (half) day.
pub fn derive_day_completion(check_out: Option<NaiveDateTime>, cutoff: NaiveTime) -> DayCompletion {
    match check_out {
        Some(at) if at.time() >= cutoff => DayCompletion::FullDay,
        _ => DayCompletion::HalfDay,
    }
}

pub fn apply_check_in(
    existing: Option<&AttendanceRecord>,
    user_id: u64,
    now: NaiveDateTime,
    policy: &AttendancePolicy,
) -> Result<AttendanceRecord, AttendanceError> {
    if existing.is_some_and(AttendanceRecord::is_checked_in) {
        return Err(AttendanceError::AlreadyCheckedIn);
    }

    // An existing row here has no check-in, i.e. it was written by the absence
    // sweep. The check-in replaces its status.
    let mut record = existing
        .cloned()
        .unwrap_or_else(|| AttendanceRecord::absent(user_id, now.date()));
    record.check_in_time = Some(now);
    record.status = derive_check_in_status(now, policy.expected_start);
    Ok(record)
}

pub fn apply_check_out(
    existing: Option<&AttendanceRecord>,
    now: NaiveDateTime,
    policy: &AttendancePolicy,
) -> Result<AttendanceRecord, AttendanceError> {
    let record = existing.ok_or(AttendanceError::NotCheckedIn)?;
    let check_in = record.check_in_time.ok_or(AttendanceError::NotCheckedIn)?;
    if record.is_checked_out() {
        return Err(AttendanceError::AlreadyCheckedOut);
    }
    if now <= check_in {
        return Err(AttendanceError::validation(
            "Check-out time must be later than check-in time",
        ));
    }

    let mut updated = record.clone();
    updated.check_out_time = Some(now);
    updated.total_hours = Some(hours_between(check_in, now));

    // One-way downgrade: a full day keeps present/late as recorded at check-in.
    if derive_day_completion(Some(now), policy.half_day_cutoff) == DayCompletion::HalfDay {
        updated.status = AttendanceStatus::HalfDay;
    }
    Ok(updated)
}

pub fn sweep_window(
    date: NaiveDate,
    now: NaiveDateTime,
    policy: &AttendancePolicy,
) -> Result<SweepWindow, AttendanceError> {
    let today = now.date();
    if date > today {
        return Err(AttendanceError::validation(
            "Cannot mark absence for a future date",
        ));
    }
    if date == today && now.time() < policy.absence_cutoff {
        return Ok(SweepWindow::TooEarly);
    }
    Ok(SweepWindow::Open)
}

pub fn mark_absent_if_unchecked_in(
    existing: Option<&AttendanceRecord>,
    user_id: u64,
    date: NaiveDate,
    now: NaiveDateTime,
    policy: &AttendancePolicy,
) -> Result<AbsenceOutcome, AttendanceError> {
    if sweep_window(date, now, policy)? == SweepWindow::TooEarly {
        return Ok(AbsenceOutcome::Deferred);
    }

    Ok(match existing {
        None => AbsenceOutcome::Mark(AttendanceRecord::absent(user_id, date)),
        Some(record) if record.is_checked_in() => AbsenceOutcome::CheckedIn,
        Some(record) if record.status == AttendanceStatus::Absent => AbsenceOutcome::AlreadyAbsent,
        Some(record) => AbsenceOutcome::Mark(AttendanceRecord {
            status: AttendanceStatus::Absent,
            ..record.clone()
        }),
    })
}

/// Elapsed hours rounded to two decimals.
pub fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let millis = (end - start).num_milliseconds() as f64;
    round_hours(millis / 3_600_000.0)
}

pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}
