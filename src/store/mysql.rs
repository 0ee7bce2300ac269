use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySqlPool};
use tracing::debug;

use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::role::Role;
use crate::model::user::{NewUser, ProfileChanges, User, UserProfile};
use crate::store::{AttendanceStore, EmployeeFilter, RecordFilter, StoreError, UserStore};

const USER_COLUMNS: &str = r#"
    id, name, email, password, role, employee_id, department, date_of_joining,
    contact_number, address, work_location, created_at
"#;

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
    OptStr(Option<String>),
    Date(NaiveDate),
    OptDate(Option<NaiveDate>),
}

macro_rules! bind_all {
    ($query:expr, $args:expr) => {{
        let mut q = $query;
        for arg in $args {
            q = match arg {
                FilterValue::U64(v) => q.bind(v),
                FilterValue::Str(v) => q.bind(v),
                FilterValue::OptStr(v) => q.bind(v),
                FilterValue::Date(v) => q.bind(v),
                FilterValue::OptDate(v) => q.bind(v),
            };
        }
        q
    }};
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    name: String,
    email: String,
    password: String,
    role: String,
    employee_id: String,
    department: Option<String>,
    date_of_joining: Option<NaiveDate>,
    contact_number: Option<String>,
    address: Option<String>,
    work_location: Option<String>,
    created_at: Option<NaiveDateTime>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|_| StoreError::InvalidData(format!("unknown role {:?}", row.role)))?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            role,
            employee_id: row.employee_id,
            department: row.department,
            date_of_joining: row.date_of_joining,
            contact_number: row.contact_number,
            address: row.address,
            work_location: row.work_location,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct RecordRow {
    user_id: u64,
    date: NaiveDate,
    check_in_time: Option<NaiveDateTime>,
    check_out_time: Option<NaiveDateTime>,
    status: String,
    total_hours: Option<f64>,
}

impl TryFrom<RecordRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status)
            .map_err(|_| StoreError::InvalidData(format!("unknown status {:?}", row.status)))?;
        Ok(AttendanceRecord {
            user_id: row.user_id,
            date: row.date,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            status,
            total_hours: row.total_hours,
        })
    }
}

#[derive(FromRow)]
struct EntryRow {
    #[sqlx(flatten)]
    record: RecordRow,
    name: String,
    email: String,
    employee_id: String,
    department: Option<String>,
}

impl TryFrom<EntryRow> for AttendanceEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(AttendanceEntry {
            record: row.record.try_into()?,
            name: row.name,
            email: row.email,
            employee_id: row.employee_id,
            department: row.department,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

fn like_pattern(search: &str) -> String {
    format!("%{}%", search.to_lowercase())
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn get_user(&self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password, role, employee_id, department)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_ref())
        .bind(&user.employee_id)
        .bind(&user.department)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::Database(e)
            }
        })?;

        let id = result.last_insert_id();
        self.get_user(id)
            .await?
            .ok_or_else(|| StoreError::InvalidData(format!("user {id} vanished after insert")))
    }

    async fn update_profile(
        &self,
        id: u64,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut sets = Vec::new();
        let mut args = Vec::new();

        if let Some(name) = &changes.name {
            sets.push("name = ?");
            args.push(FilterValue::Str(name.clone()));
        }
        if let Some(contact_number) = &changes.contact_number {
            sets.push("contact_number = ?");
            args.push(FilterValue::OptStr(contact_number.clone()));
        }
        if let Some(address) = &changes.address {
            sets.push("address = ?");
            args.push(FilterValue::OptStr(address.clone()));
        }
        if let Some(work_location) = &changes.work_location {
            sets.push("work_location = ?");
            args.push(FilterValue::OptStr(work_location.clone()));
        }
        if let Some(date_of_joining) = changes.date_of_joining {
            sets.push("date_of_joining = ?");
            args.push(FilterValue::OptDate(date_of_joining));
        }

        if !sets.is_empty() {
            args.push(FilterValue::U64(id));
            let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
            debug!(sql = %sql, "Updating profile");
            bind_all!(sqlx::query(&sql), args)
                .execute(&self.pool)
                .await?;
        }

        self.get_user(id).await
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> Result<Vec<UserProfile>, StoreError> {
        let mut where_sql = String::from(" WHERE role = 'employee'");
        let mut args = Vec::new();

        if let Some(department) = &filter.department {
            where_sql.push_str(" AND department = ?");
            args.push(FilterValue::Str(department.clone()));
        }
        if let Some(search) = &filter.search {
            where_sql.push_str(
                " AND (LOWER(name) LIKE ? OR LOWER(employee_id) LIKE ? OR LOWER(email) LIKE ?)",
            );
            let like = like_pattern(search);
            args.push(FilterValue::Str(like.clone()));
            args.push(FilterValue::Str(like.clone()));
            args.push(FilterValue::Str(like));
        }

        let sql = format!("SELECT {USER_COLUMNS} FROM users{where_sql} ORDER BY name");
        let rows = bind_all!(sqlx::query_as::<_, UserRow>(&sql), args)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| User::try_from(row).map(|u| UserProfile::from(&u)))
            .collect()
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_record(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT user_id, date, check_in_time, check_out_time, status, total_hours
            FROM attendance
            WHERE user_id = ? AND date = ?
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendance (user_id, date, check_in_time, check_out_time, status, total_hours)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.user_id)
        .bind(record.date)
        .bind(record.check_in_time)
        .bind(record.check_out_time)
        .bind(record.status.as_ref())
        .bind(record.total_hours)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn record_check_in(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_in_time = ?, status = ?
            WHERE user_id = ?
            AND date = ?
            AND check_in_time IS NULL
            "#,
        )
        .bind(record.check_in_time)
        .bind(record.status.as_ref())
        .bind(record.user_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, status = ?, total_hours = ?
            WHERE user_id = ?
            AND date = ?
            AND check_in_time IS NOT NULL
            AND check_out_time IS NULL
            "#,
        )
        .bind(record.check_out_time)
        .bind(record.status.as_ref())
        .bind(record.total_hours)
        .bind(record.user_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_absent(&self, user_id: u64, date: NaiveDate) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET status = 'absent'
            WHERE user_id = ?
            AND date = ?
            AND check_in_time IS NULL
            AND status <> 'absent'
            "#,
        )
        .bind(user_id)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_records(&self, filter: &RecordFilter) -> Result<Vec<AttendanceEntry>, StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args = Vec::new();

        if let Some(user_id) = filter.user_id {
            where_sql.push_str(" AND a.user_id = ?");
            args.push(FilterValue::U64(user_id));
        }
        if let Some(code) = &filter.employee_code {
            where_sql.push_str(" AND u.employee_id = ?");
            args.push(FilterValue::Str(code.clone()));
        }
        if let Some(department) = &filter.department {
            where_sql.push_str(" AND u.department = ?");
            args.push(FilterValue::Str(department.clone()));
        }
        if let Some(start) = filter.start_date {
            where_sql.push_str(" AND a.date >= ?");
            args.push(FilterValue::Date(start));
        }
        if let Some(end) = filter.end_date {
            where_sql.push_str(" AND a.date <= ?");
            args.push(FilterValue::Date(end));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND a.status = ?");
            args.push(FilterValue::Str(status.to_string()));
        }
        if let Some(search) = &filter.search {
            where_sql.push_str(
                " AND (LOWER(u.name) LIKE ? OR LOWER(u.employee_id) LIKE ? OR LOWER(u.email) LIKE ?)",
            );
            let like = like_pattern(search);
            args.push(FilterValue::Str(like.clone()));
            args.push(FilterValue::Str(like.clone()));
            args.push(FilterValue::Str(like));
        }

        let sql = format!(
            r#"
            SELECT a.user_id, a.date, a.check_in_time, a.check_out_time, a.status, a.total_hours,
                   u.name, u.email, u.employee_id, u.department
            FROM attendance a
            JOIN users u ON a.user_id = u.id
            {where_sql}
            ORDER BY a.date DESC, u.name
            "#
        );
        debug!(sql = %sql, "Querying attendance records");

        let rows = bind_all!(sqlx::query_as::<_, EntryRow>(&sql), args)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AttendanceEntry::try_from).collect()
    }
}
