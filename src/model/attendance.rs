use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    HalfDay,
}

/// One row per (user, calendar date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "user_id": 2,
    "date": "2026-01-05",
    "check_in_time": "2026-01-05T10:15:00",
    "check_out_time": "2026-01-05T18:00:00",
    "status": "late",
    "total_hours": 7.75
}))]
pub struct AttendanceRecord {
    pub user_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub total_hours: Option<f64>,
}

impl AttendanceRecord {
    pub fn absent(user_id: u64, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            check_in_time: None,
            check_out_time: None,
            status: AttendanceStatus::Absent,
            total_hours: None,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.check_in_time.is_some()
    }

    pub fn is_checked_out(&self) -> bool {
        self.check_out_time.is_some()
    }
}

/// A record joined with the identity fields of its owner, as listed to managers
/// and exported.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub name: String,
    pub email: String,
    #[schema(example = "EMP001")]
    pub employee_id: String,
    pub department: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_uses_kebab_case_on_the_wire() {
        assert_eq!(AttendanceStatus::HalfDay.to_string(), "half-day");
        assert_eq!(
            AttendanceStatus::from_str("half-day").unwrap(),
            AttendanceStatus::HalfDay
        );
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Late).unwrap(),
            "\"late\""
        );
        assert!(AttendanceStatus::from_str("holiday").is_err());
    }
}
