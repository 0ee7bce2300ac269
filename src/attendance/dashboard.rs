use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::summary::AttendanceSummary;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::user::UserProfile;

const NO_DEPARTMENT: &str = "No Department";
const TREND_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TodayStatus {
    pub checked_in: bool,
    pub checked_out: bool,
    pub attendance: Option<AttendanceRecord>,
}

impl From<Option<AttendanceRecord>> for TodayStatus {
    fn from(record: Option<AttendanceRecord>) -> Self {
        Self {
            checked_in: record.as_ref().is_some_and(AttendanceRecord::is_checked_in),
            checked_out: record.as_ref().is_some_and(AttendanceRecord::is_checked_out),
            attendance: record,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeDashboard {
    pub today: TodayStatus,
    pub monthly_summary: AttendanceSummary,
    pub recent_attendance: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct DayCounts {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LateArrival {
    pub id: u64,
    pub name: String,
    pub employee_id: String,
    pub department: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyTrend {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub present: u32,
    pub absent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentAttendance {
    pub department: String,
    pub total_employees: u32,
    pub present: u32,
    pub absent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ManagerDashboard {
    pub total_employees: u32,
    pub today_attendance: DayCounts,
    pub late_arrivals: Vec<LateArrival>,
    pub weekly_trend: Vec<DailyTrend>,
    pub department_wise: Vec<DepartmentAttendance>,
    pub absent_today: Vec<UserProfile>,
}

/// One employee's row in the manager's "today" view; record fields are empty
/// when nothing was recorded yet.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeDayStatus {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub employee_id: String,
    pub department: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,
    pub status: Option<AttendanceStatus>,
}

/// Present means a real check-in that is not recorded as absent; everything
/// else, including a missing record, is absent.
fn attended(record: Option<&AttendanceRecord>) -> bool {
    record.is_some_and(|r| r.is_checked_in() && r.status != AttendanceStatus::Absent)
}

fn index_by_day(records: &[AttendanceRecord]) -> HashMap<(u64, NaiveDate), &AttendanceRecord> {
    records.iter().map(|r| ((r.user_id, r.date), r)).collect()
}

fn by_name(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Builds the manager dashboard for `employees` from their records of the last
/// seven days ending `today`. Records of other users are ignored.
pub fn build_manager_dashboard(
    employees: &[UserProfile],
    records: &[AttendanceRecord],
    today: NaiveDate,
) -> ManagerDashboard {
    let by_day = index_by_day(records);
    let record_for = |user_id: u64, date: NaiveDate| by_day.get(&(user_id, date)).copied();

    let mut today_attendance = DayCounts::default();
    let mut late_arrivals = Vec::new();
    let mut absent_today = Vec::new();
    let mut departments: BTreeMap<String, DepartmentAttendance> = BTreeMap::new();

    for employee in employees {
        let record = record_for(employee.id, today);
        let present = attended(record);

        let department = employee
            .department
            .clone()
            .unwrap_or_else(|| NO_DEPARTMENT.to_string());
        let entry = departments
            .entry(department.clone())
            .or_insert_with(|| DepartmentAttendance {
                department,
                total_employees: 0,
                present: 0,
                absent: 0,
            });
        entry.total_employees += 1;

        if present {
            today_attendance.present += 1;
            entry.present += 1;
        } else {
            today_attendance.absent += 1;
            entry.absent += 1;
            absent_today.push(employee.clone());
        }

        if let Some(r) = record.filter(|r| r.status == AttendanceStatus::Late) {
            today_attendance.late += 1;
            late_arrivals.push(LateArrival {
                id: employee.id,
                name: employee.name.clone(),
                employee_id: employee.employee_id.clone(),
                department: employee.department.clone(),
                check_in_time: r.check_in_time,
            });
        }
    }

    late_arrivals.sort_by_key(|a| a.check_in_time);
    absent_today.sort_by(|a, b| by_name(&a.name, &b.name));

    let weekly_trend = (0..TREND_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let present = employees
                .iter()
                .filter(|e| attended(record_for(e.id, date)))
                .count() as u32;
            DailyTrend {
                date,
                present,
                absent: employees.len() as u32 - present,
            }
        })
        .collect();

    ManagerDashboard {
        total_employees: employees.len() as u32,
        today_attendance,
        late_arrivals,
        weekly_trend,
        department_wise: departments.into_values().collect(),
        absent_today,
    }
}

/// Every employee alongside today's record, ordered by name.
pub fn today_overview(
    employees: &[UserProfile],
    records: &[AttendanceRecord],
    today: NaiveDate,
) -> Vec<EmployeeDayStatus> {
    let by_day = index_by_day(records);
    let mut rows: Vec<EmployeeDayStatus> = employees
        .iter()
        .map(|employee| {
            let record = by_day.get(&(employee.id, today));
            EmployeeDayStatus {
                id: employee.id,
                name: employee.name.clone(),
                email: employee.email.clone(),
                employee_id: employee.employee_id.clone(),
                department: employee.department.clone(),
                check_in_time: record.and_then(|r| r.check_in_time),
                check_out_time: record.and_then(|r| r.check_out_time),
                status: record.map(|r| r.status),
            }
        })
        .collect();
    rows.sort_by(|a, b| by_name(&a.name, &b.name));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn employee(id: u64, name: &str, department: Option<&str>) -> UserProfile {
        UserProfile {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: Role::Employee,
            employee_id: format!("EMP{id:03}"),
            department: department.map(str::to_string),
            date_of_joining: None,
            contact_number: None,
            address: None,
            work_location: None,
        }
    }

    fn checked_in(user_id: u64, date: NaiveDate, h: u32, m: u32, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            check_in_time: Some(date.and_hms_opt(h, m, 0).unwrap()),
            status,
            ..AttendanceRecord::absent(user_id, date)
        }
    }

    #[test]
    fn today_status_reflects_record() {
        let none = TodayStatus::from(None);
        assert!(!none.checked_in && !none.checked_out && none.attendance.is_none());

        let record = checked_in(1, today(), 9, 0, AttendanceStatus::Present);
        let status = TodayStatus::from(Some(record));
        assert!(status.checked_in);
        assert!(!status.checked_out);
    }

    #[test]
    fn manager_dashboard_counts_today() {
        let employees = vec![
            employee(1, "Alice", Some("Engineering")),
            employee(2, "Bob", Some("Engineering")),
            employee(3, "Charlie", None),
            employee(4, "Diana", Some("Sales")),
        ];
        let records = vec![
            checked_in(1, today(), 9, 30, AttendanceStatus::Present),
            checked_in(2, today(), 10, 40, AttendanceStatus::Late),
            checked_in(4, today(), 10, 5, AttendanceStatus::Late),
            AttendanceRecord::absent(3, today()),
        ];

        let dashboard = build_manager_dashboard(&employees, &records, today());

        assert_eq!(dashboard.total_employees, 4);
        assert_eq!(
            dashboard.today_attendance,
            DayCounts { present: 3, absent: 1, late: 2 }
        );
        let late: Vec<_> = dashboard.late_arrivals.iter().map(|a| a.id).collect();
        assert_eq!(late, vec![4, 2]);
        assert_eq!(dashboard.absent_today.len(), 1);
        assert_eq!(dashboard.absent_today[0].id, 3);

        let departments: Vec<_> = dashboard
            .department_wise
            .iter()
            .map(|d| (d.department.as_str(), d.total_employees, d.present, d.absent))
            .collect();
        assert_eq!(
            departments,
            vec![
                ("Engineering", 2, 2, 0),
                ("No Department", 1, 0, 1),
                ("Sales", 1, 1, 0),
            ]
        );
    }

    #[test]
    fn weekly_trend_covers_seven_days_in_order() {
        let employees = vec![employee(1, "Alice", None), employee(2, "Bob", None)];
        let three_days_ago = today() - Duration::days(3);
        let records = vec![
            checked_in(1, three_days_ago, 9, 0, AttendanceStatus::Present),
            checked_in(2, today(), 9, 0, AttendanceStatus::HalfDay),
            // a non-employee record must not leak into the counts
            checked_in(99, today(), 9, 0, AttendanceStatus::Present),
        ];

        let dashboard = build_manager_dashboard(&employees, &records, today());

        assert_eq!(dashboard.weekly_trend.len(), 7);
        assert_eq!(dashboard.weekly_trend[0].date, today() - Duration::days(6));
        assert_eq!(dashboard.weekly_trend[6].date, today());
        assert_eq!(dashboard.weekly_trend[3].present, 1);
        assert_eq!(dashboard.weekly_trend[3].absent, 1);
        assert_eq!(dashboard.weekly_trend[6].present, 1);
        assert_eq!(dashboard.weekly_trend[0].absent, 2);
    }

    #[test]
    fn today_overview_lists_everyone_by_name() {
        let employees = vec![employee(2, "bob", None), employee(1, "Alice", None)];
        let records = vec![checked_in(2, today(), 9, 0, AttendanceStatus::Present)];

        let rows = today_overview(&employees, &records, today());

        assert_eq!(rows[0].name, "Alice");
        assert_eq!(rows[0].status, None);
        assert_eq!(rows[1].status, Some(AttendanceStatus::Present));
    }
}
