use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::attendance::dashboard::{EmployeeDayStatus, TodayStatus};
use crate::attendance::summary::{AttendanceSummary, TeamSummary};
use crate::attendance::{AttendanceError, SweepOutcome};
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::state::AppState;
use crate::store::RecordFilter;

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PeriodQuery {
    /// Month 1-12, defaults to the current month
    #[schema(example = 3)]
    pub month: Option<u32>,
    /// Year 2000-3000, defaults to the current year
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilterQuery {
    /// Employee code, e.g. EMP001
    #[schema(example = "EMP001")]
    pub employee_id: Option<String>,
    #[schema(example = "2026-03-01", format = "date")]
    pub start_date: Option<String>,
    #[schema(example = "2026-03-31", format = "date")]
    pub end_date: Option<String>,
    /// present | late | absent | half-day
    #[schema(example = "late")]
    pub status: Option<String>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    /// Case-insensitive match on name, employee code or email
    #[schema(example = "alice")]
    pub search: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AttendanceError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AttendanceError::validation(format!("{field} must be YYYY-MM-DD")))
}

impl TryFrom<AttendanceFilterQuery> for RecordFilter {
    type Error = AttendanceError;

    fn try_from(query: AttendanceFilterQuery) -> Result<Self, Self::Error> {
        let start_date = non_empty(query.start_date)
            .map(|raw| parse_date("start_date", &raw))
            .transpose()?;
        let end_date = non_empty(query.end_date)
            .map(|raw| parse_date("end_date", &raw))
            .transpose()?;
        let status = non_empty(query.status)
            .map(|raw| {
                raw.parse::<AttendanceStatus>()
                    .map_err(|_| AttendanceError::validation(format!("Unknown status '{raw}'")))
            })
            .transpose()?;

        Ok(RecordFilter {
            user_id: None,
            employee_code: non_empty(query.employee_id),
            department: non_empty(query.department),
            start_date,
            end_date,
            status,
            search: non_empty(query.search),
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MarkAbsentRequest {
    /// Day to sweep, defaults to today
    #[schema(example = "2026-03-10", format = "date")]
    pub date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceActionResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub attendance: AttendanceRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    #[schema(example = "Absent employees marked successfully")]
    pub message: String,
    /// Employees without a check-in for the day; absent while deferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 3)]
    pub count: Option<usize>,
}

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    responses(
        (status = 200, description = "Checked in", body = AttendanceActionResponse),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Concurrent write, retry")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(auth, state), fields(user_id = auth.user_id))]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let attendance = state.attendance.check_in(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(AttendanceActionResponse {
        message: "Checked in successfully".into(),
        attendance,
    }))
}

/// Check out for today
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    responses(
        (status = 200, description = "Checked out", body = AttendanceActionResponse),
        (status = 400, description = "Not checked in, or already checked out", body = Object, example = json!({
            "message": "Please check in first"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(auth, state), fields(user_id = auth.user_id))]
pub async fn check_out(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let attendance = state.attendance.check_out(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(AttendanceActionResponse {
        message: "Checked out successfully".into(),
        attendance,
    }))
}

/// Caller's status for today
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's status", body = TodayStatus),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let status = state.attendance.today_status(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Caller's records for a month, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/my-history",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Records", body = [AttendanceRecord]),
        (status = 400, description = "Invalid month or year"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_history(
    auth: AuthUser,
    query: web::Query<PeriodQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let records = state
        .attendance
        .history(auth.user_id, query.month, query.year)
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Caller's monthly summary
#[utoipa::path(
    get,
    path = "/api/attendance/my-summary",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Summary", body = AttendanceSummary),
        (status = 400, description = "Invalid month or year"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_summary(
    auth: AuthUser,
    query: web::Query<PeriodQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let summary = state
        .attendance
        .monthly_summary(auth.user_id, query.month, query.year)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// All records, filtered (manager)
#[utoipa::path(
    get,
    path = "/api/attendance/all",
    params(AttendanceFilterQuery),
    responses(
        (status = 200, description = "Records joined with employees", body = [AttendanceEntry]),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn all_records(
    auth: AuthUser,
    query: web::Query<AttendanceFilterQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let filter = RecordFilter::try_from(query.into_inner())?;
    let entries = state.attendance.list_records(&filter).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Records of one employee (manager)
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "Records", body = [AttendanceEntry]),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn employee_records(
    auth: AuthUser,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let entries = state.attendance.employee_records(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Team summary for a month (manager)
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Team summary", body = TeamSummary),
        (status = 400, description = "Invalid month or year"),
        (status = 403, description = "Manager role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn team_summary(
    auth: AuthUser,
    query: web::Query<PeriodQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let summary = state.attendance.team_summary(query.month, query.year).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Mark employees without a check-in as absent (manager)
#[utoipa::path(
    post,
    path = "/api/attendance/mark-absent",
    request_body(
        content = MarkAbsentRequest,
        description = "Optional; an empty body sweeps today",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Sweep completed or deferred", body = SweepResponse),
        (status = 400, description = "Invalid or future date"),
        (status = 403, description = "Manager role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(auth, body, state), fields(user_id = auth.user_id))]
pub async fn mark_absent(
    auth: AuthUser,
    body: Option<web::Json<MarkAbsentRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let date = body
        .and_then(|b| non_empty(b.into_inner().date))
        .map(|raw| parse_date("date", &raw))
        .transpose()?;

    let response = match state.attendance.mark_absent_sweep(date).await? {
        SweepOutcome::Deferred => SweepResponse {
            message: "Cannot mark absent before 12pm. Please try again after noon.".into(),
            count: None,
        },
        SweepOutcome::Completed { count } => SweepResponse {
            message: "Absent employees marked successfully".into(),
            count: Some(count),
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Export filtered records as CSV (manager)
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(AttendanceFilterQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "No data to export", body = Object, example = json!({
            "message": "No data to export"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(auth, query, state), fields(user_id = auth.user_id))]
pub async fn export(
    auth: AuthUser,
    query: web::Query<AttendanceFilterQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let filter = RecordFilter::try_from(query.into_inner())?;
    let csv = state.attendance.export(&filter).await?;

    let file_name = state.attendance.export_file_name();
    info!(%file_name, bytes = csv.len(), "Attendance exported");

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .body(csv))
}

/// Every employee with today's record (manager)
#[utoipa::path(
    get,
    path = "/api/attendance/today-status",
    responses(
        (status = 200, description = "Today's overview", body = [EmployeeDayStatus]),
        (status = 403, description = "Manager role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today_status(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let rows = state.attendance.today_overview().await?;
    Ok(HttpResponse::Ok().json(rows))
}
