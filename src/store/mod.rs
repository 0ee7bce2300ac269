//! Persistence seams for identities and attendance records.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::user::{NewUser, ProfileChanges, User, UserProfile};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key (one record per user and day, one account per email) was hit.
    #[error("unique constraint violated")]
    Conflict,

    #[error("stored value is invalid: {0}")]
    InvalidData(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Filters for the joined record listing. All filters are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub user_id: Option<u64>,
    /// Human-readable employee code, e.g. `EMP001`.
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
    /// Case-insensitive substring over name, employee code and email.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub search: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn count_users(&self) -> Result<u64, StoreError>;

    /// Fails with [`StoreError::Conflict`] on a duplicate email or employee code.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn update_profile(
        &self,
        id: u64,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, StoreError>;

    /// Users with the `employee` role, ordered by name.
    async fn list_employees(&self, filter: &EmployeeFilter) -> Result<Vec<UserProfile>, StoreError>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_record(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when a row for (user, date) exists.
    async fn insert_record(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Writes the check-in time and status only while the stored row still has
    /// no check-in. Returns whether a row was changed.
    async fn record_check_in(&self, record: &AttendanceRecord) -> Result<bool, StoreError>;

    /// Writes the check-out time, status and hours only while the stored row is
    /// checked in and not yet checked out. Returns whether a row was changed.
    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<bool, StoreError>;

    /// Sets the row's status to absent only while it still has no check-in.
    /// Returns whether a row was changed.
    async fn mark_absent(&self, user_id: u64, date: NaiveDate) -> Result<bool, StoreError>;

    /// Records joined with their owners, newest date first, then by name.
    async fn query_records(&self, filter: &RecordFilter) -> Result<Vec<AttendanceEntry>, StoreError>;
}

pub(crate) fn matches_search(needle: &str, haystacks: &[&str]) -> bool {
    let needle = needle.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}
