use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("Already checked out today")]
    AlreadyCheckedOut,

    #[error("Please check in first")]
    NotCheckedIn,

    #[error("Attendance record was modified concurrently, please retry")]
    RecordConflict,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to encode export: {0}")]
    Export(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttendanceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
