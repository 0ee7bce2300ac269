use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::attendance::{
    AttendanceActionResponse, AttendanceFilterQuery, MarkAbsentRequest, PeriodQuery, SweepResponse,
};
use crate::api::dashboard::DepartmentQuery;
use crate::attendance::dashboard::{
    DailyTrend, DayCounts, DepartmentAttendance, EmployeeDashboard, EmployeeDayStatus,
    LateArrival, ManagerDashboard, TodayStatus,
};
use crate::attendance::summary::{AttendanceSummary, TeamSummary};
use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::role::Role;
use crate::model::user::UserProfile;
use crate::models::{AuthResponse, LoginReq, ProfileUpdateReq, RegisterReq};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Daily check-in and check-out for employees, with attendance history and
reporting for managers.

### Attendance rules
- Check-in after **10:00** is `late`, otherwise `present`
- Check-out before **14:00** downgrades the day to `half-day`
- Employees without a check-in are marked `absent` once it is past **12:00**

### Security
Endpoints under `/api` require a **JWT Bearer** token from `/auth/login` or
`/auth/register`. Team-wide reports require the `manager` role.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::me,
        crate::auth::handlers::update_profile,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::my_history,
        crate::api::attendance::my_summary,
        crate::api::attendance::all_records,
        crate::api::attendance::employee_records,
        crate::api::attendance::team_summary,
        crate::api::attendance::mark_absent,
        crate::api::attendance::export,
        crate::api::attendance::today_status,

        crate::api::dashboard::employee,
        crate::api::dashboard::manager
    ),
    components(
        schemas(
            RegisterReq,
            LoginReq,
            ProfileUpdateReq,
            AuthResponse,
            UserProfile,
            Role,
            AttendanceStatus,
            AttendanceRecord,
            AttendanceEntry,
            AttendanceActionResponse,
            SweepResponse,
            MarkAbsentRequest,
            PeriodQuery,
            AttendanceFilterQuery,
            DepartmentQuery,
            AttendanceSummary,
            TeamSummary,
            TodayStatus,
            EmployeeDashboard,
            ManagerDashboard,
            DayCounts,
            LateArrival,
            DailyTrend,
            DepartmentAttendance,
            EmployeeDayStatus
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and profile APIs"),
        (name = "Attendance", description = "Check-in, history and reporting APIs"),
        (name = "Dashboard", description = "Employee and manager dashboards"),
    )
)]
pub struct ApiDoc;
