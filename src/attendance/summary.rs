use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::engine::round_hours;
use crate::attendance::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

/// Counts over a set of records.
///
/// `late` days are counted in both `present` and `late`; downstream displays rely
/// on that overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "present": 18,
    "absent": 2,
    "late": 4,
    "half_day": 1,
    "total_hours": 151.25
}))]
pub struct AttendanceSummary {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub half_day: u32,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct TeamSummary {
    pub total_employees: u32,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

pub fn summarize<'a, I>(records: I) -> AttendanceSummary
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut summary = AttendanceSummary::default();
    for record in records {
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Late => {
                summary.present += 1;
                summary.late += 1;
            }
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::HalfDay => summary.half_day += 1,
        }
        summary.total_hours += record.total_hours.unwrap_or(0.0);
    }
    summary.total_hours = round_hours(summary.total_hours);
    summary
}

pub fn summarize_team<'a, I>(records: I) -> TeamSummary
where
    I: IntoIterator<Item = &'a AttendanceRecord> + Clone,
{
    let users: HashSet<u64> = records.clone().into_iter().map(|r| r.user_id).collect();
    TeamSummary {
        total_employees: users.len() as u32,
        summary: summarize(records),
    }
}

/// Inclusive first and last day of a calendar month.
pub fn month_range(month: u32, year: i32) -> Result<(NaiveDate, NaiveDate), AttendanceError> {
    if !(1..=12).contains(&month) {
        return Err(AttendanceError::validation("month must be between 1 and 12"));
    }
    if !(2000..=3000).contains(&year) {
        return Err(AttendanceError::validation(
            "year must be between 2000 and 3000",
        ));
    }

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AttendanceError::validation("invalid month/year"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AttendanceError::validation("invalid month/year"))?;
    Ok((first, last))
}

/// Resolves optional month/year query values against today's date.
pub fn resolve_period(
    month: Option<u32>,
    year: Option<i32>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), AttendanceError> {
    month_range(month.unwrap_or(today.month()), year.unwrap_or(today.year()))
}
