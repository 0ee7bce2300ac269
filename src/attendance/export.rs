use chrono::NaiveDateTime;

use crate::attendance::error::AttendanceError;
use crate::model::attendance::AttendanceEntry;

pub const HEADERS: [&str; 9] = [
    "Employee ID",
    "Name",
    "Email",
    "Department",
    "Date",
    "Check In",
    "Check Out",
    "Status",
    "Total Hours",
];

fn timestamp(value: Option<NaiveDateTime>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Renders entries as CSV; missing values become empty cells.
pub fn render_csv(entries: &[AttendanceEntry]) -> Result<Vec<u8>, AttendanceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(HEADERS)
        .map_err(|e| AttendanceError::Export(e.to_string()))?;

    for entry in entries {
        let record = &entry.record;
        writer
            .write_record([
                entry.employee_id.clone(),
                entry.name.clone(),
                entry.email.clone(),
                entry.department.clone().unwrap_or_default(),
                record.date.to_string(),
                timestamp(record.check_in_time),
                timestamp(record.check_out_time),
                record.status.to_string(),
                record
                    .total_hours
                    .map(|h| format!("{h:.2}"))
                    .unwrap_or_default(),
            ])
            .map_err(|e| AttendanceError::Export(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| AttendanceError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
    use chrono::NaiveDate;

    #[test]
    fn renders_header_and_rows_with_quoting() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let entries = vec![
            AttendanceEntry {
                record: AttendanceRecord {
                    check_in_time: date.and_hms_opt(10, 15, 0),
                    check_out_time: date.and_hms_opt(18, 0, 0),
                    status: AttendanceStatus::Late,
                    total_hours: Some(7.75),
                    ..AttendanceRecord::absent(1, date)
                },
                name: "Smith, Alice".into(),
                email: "alice@example.com".into(),
                employee_id: "EMP001".into(),
                department: Some("Engineering".into()),
            },
            AttendanceEntry {
                record: AttendanceRecord::absent(2, date),
                name: "Bob".into(),
                email: "bob@example.com".into(),
                employee_id: "EMP002".into(),
                department: None,
            },
        ];

        let csv = String::from_utf8(render_csv(&entries).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Employee ID,Name,Email,Department,Date,Check In,Check Out,Status,Total Hours"
        );
        assert_eq!(
            lines[1],
            "EMP001,\"Smith, Alice\",alice@example.com,Engineering,2026-03-10,2026-03-10 10:15:00,2026-03-10 18:00:00,late,7.75"
        );
        assert_eq!(lines[2], "EMP002,Bob,bob@example.com,,2026-03-10,,,absent,");
    }
}
