use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::role::Role;
use crate::model::user::{ProfileChanges, UserProfile};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Alice Smith",
    "email": "alice@example.com",
    "password": "secret1",
    "role": "employee",
    "department": "Engineering"
}))]
pub struct RegisterReq {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub department: Option<String>,
}

fn default_role() -> String {
    Role::Employee.to_string()
}

impl RegisterReq {
    /// Checks the payload and returns the parsed role.
    pub fn validate(&self) -> Result<Role, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        if !self.email.contains('@') {
            return Err(AppError::BadRequest("A valid email is required".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        self.role
            .parse::<Role>()
            .map_err(|_| AppError::BadRequest("Role must be employee or manager".into()))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({ "email": "alice@example.com", "password": "secret1" }))]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

/// Every field is optional; an empty string clears the stored value.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[schema(example = json!({ "contact_number": "+49 30 123456", "work_location": "Berlin" }))]
pub struct ProfileUpdateReq {
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub work_location: Option<String>,
    #[schema(example = "2024-01-01", format = "date", value_type = Option<String>)]
    pub date_of_joining: Option<String>,
}

fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl TryFrom<ProfileUpdateReq> for ProfileChanges {
    type Error = AppError;

    fn try_from(req: ProfileUpdateReq) -> Result<Self, Self::Error> {
        let name = match req.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::BadRequest("Name cannot be empty".into()));
            }
            other => other.map(|n| n.trim().to_string()),
        };

        let date_of_joining = match clearable(req.date_of_joining) {
            Some(Some(raw)) => Some(Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                    AppError::BadRequest("date_of_joining must be YYYY-MM-DD".into())
                })?,
            )),
            Some(None) => Some(None),
            None => None,
        };

        let changes = ProfileChanges {
            name,
            contact_number: clearable(req.contact_number),
            address: clearable(req.address),
            work_location: clearable(req.work_location),
            date_of_joining,
        };
        if changes.is_empty() {
            return Err(AppError::BadRequest("No profile fields supplied".into()));
        }
        Ok(changes)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9...")]
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Account email.
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}
