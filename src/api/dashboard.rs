use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::attendance::dashboard::{EmployeeDashboard, ManagerDashboard};
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct DepartmentQuery {
    /// Restrict the dashboard to one department
    #[schema(example = "Engineering")]
    pub department: Option<String>,
}

/// Caller's dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard/employee",
    responses(
        (status = 200, description = "Today, this month and the last 7 days", body = EmployeeDashboard),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn employee(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let dashboard = state.attendance.employee_dashboard(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

/// Team dashboard (manager)
#[utoipa::path(
    get,
    path = "/api/dashboard/manager",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Team attendance overview", body = ManagerDashboard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn manager(
    auth: AuthUser,
    query: web::Query<DepartmentQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let department = query
        .into_inner()
        .department
        .filter(|d| !d.trim().is_empty());
    let dashboard = state.attendance.manager_dashboard(department).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
