use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Creates the tables if they are missing. The `(user_id, date)` unique key is
/// what keeps a check-in and a concurrent absence sweep from producing two rows.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            email VARCHAR(255) NOT NULL,
            password VARCHAR(255) NOT NULL,
            role VARCHAR(20) NOT NULL,
            employee_id VARCHAR(50) NOT NULL,
            department VARCHAR(100) NULL,
            date_of_joining DATE NULL,
            contact_number VARCHAR(20) NULL,
            address TEXT NULL,
            work_location VARCHAR(255) NULL,
            created_at DATETIME NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE KEY uq_users_email (email),
            UNIQUE KEY uq_users_employee_id (employee_id),
            CONSTRAINT chk_users_role CHECK (role IN ('employee', 'manager'))
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT UNSIGNED NOT NULL,
            date DATE NOT NULL,
            check_in_time DATETIME NULL,
            check_out_time DATETIME NULL,
            status VARCHAR(20) NOT NULL,
            total_hours DOUBLE NULL,
            created_at DATETIME NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE KEY uq_attendance_user_date (user_id, date),
            INDEX idx_attendance_date (date),
            CONSTRAINT fk_attendance_user FOREIGN KEY (user_id)
                REFERENCES users (id) ON DELETE CASCADE,
            CONSTRAINT chk_attendance_status
                CHECK (status IN ('present', 'absent', 'late', 'half-day'))
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create attendance table")?;

    info!("Database schema ready");
    Ok(())
}
