//! HTTP-facing error type. Every handler returns `Result<_, AppError>` and the
//! response body is always `{"message": ...}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::attendance::AttendanceError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Client-facing message. Internal failures never leak their details.
    pub fn message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Attendance(err) => match err {
                AttendanceError::AlreadyCheckedIn
                | AttendanceError::AlreadyCheckedOut
                | AttendanceError::NotCheckedIn
                | AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
                AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
                AttendanceError::RecordConflict => StatusCode::CONFLICT,
                AttendanceError::Export(_) | AttendanceError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Store(StoreError::Conflict) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_internal() {
            tracing::error!(error = %self, "Request failed");
        }
        HttpResponse::build(self.status_code()).json(json!({ "message": self.message() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendance_errors_map_to_client_statuses() {
        let cases = [
            (AttendanceError::AlreadyCheckedIn, StatusCode::BAD_REQUEST),
            (AttendanceError::AlreadyCheckedOut, StatusCode::BAD_REQUEST),
            (AttendanceError::NotCheckedIn, StatusCode::BAD_REQUEST),
            (AttendanceError::validation("bad month"), StatusCode::BAD_REQUEST),
            (AttendanceError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (AttendanceError::RecordConflict, StatusCode::CONFLICT),
            (AttendanceError::Store(StoreError::Poisoned), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AppError::Store(StoreError::InvalidData("status 'x'".into()));
        assert_eq!(err.message(), "Internal server error");

        let err = AppError::from(AttendanceError::NotCheckedIn);
        assert_eq!(err.message(), "Please check in first");
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }
}
