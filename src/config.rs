use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use dotenvy::dotenv;
use tracing::Level;

use crate::attendance::policy::AttendancePolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_level: Level,

    // Attendance policy
    pub expected_start_time: NaiveTime,
    pub half_day_cutoff: NaiveTime,
    pub absence_cutoff: NaiveTime,

    /// Seconds between scheduled absence sweeps, 0 disables the scheduler.
    pub sweep_interval_secs: u64,
    pub user_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so parsing can be exercised without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 604_800)?, // 7 days
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parse_or(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            log_level: parse_or(&lookup, "LOG_LEVEL", Level::DEBUG)?,

            expected_start_time: time_or(&lookup, "EXPECTED_START_TIME", "10:00:00")?,
            half_day_cutoff: time_or(&lookup, "HALF_DAY_CUTOFF", "14:00:00")?,
            absence_cutoff: time_or(&lookup, "ABSENCE_CUTOFF", "12:00:00")?,

            sweep_interval_secs: parse_or(&lookup, "SWEEP_INTERVAL_SECS", 900)?,
            user_cache_ttl_secs: parse_or(&lookup, "USER_CACHE_TTL_SECS", 300)?,
        })
    }

    pub fn policy(&self) -> AttendancePolicy {
        AttendancePolicy {
            expected_start: self.expected_start_time,
            half_day_cutoff: self.half_day_cutoff,
            absence_cutoff: self.absence_cutoff,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

fn time_or<F>(lookup: &F, key: &str, default: &str) -> Result<NaiveTime>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S")
        .with_context(|| format!("{key} must be formatted as HH:MM:SS, got {raw:?}"))
}
