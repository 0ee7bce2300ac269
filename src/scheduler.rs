//! Periodic absence sweep, run in-process instead of from an external cron.

use std::time::Duration;

use actix_web::rt::{self, task::JoinHandle, time};
use tracing::{debug, error, info};

use crate::attendance::{AttendanceService, SweepOutcome};

/// Runs one sweep for today and logs the outcome.
pub async fn run_sweep(service: &AttendanceService) -> Option<SweepOutcome> {
    match service.mark_absent_sweep(None).await {
        Ok(SweepOutcome::Deferred) => {
            debug!("Scheduled absence sweep deferred until cutoff");
            Some(SweepOutcome::Deferred)
        }
        Ok(outcome @ SweepOutcome::Completed { count }) => {
            info!(count, "Scheduled absence sweep completed");
            Some(outcome)
        }
        Err(e) => {
            error!(error = %e, "Scheduled absence sweep failed");
            None
        }
    }
}

/// Spawns the sweep loop. Returns `None` when `interval_secs` is 0.
pub fn spawn_absence_sweep(service: AttendanceService, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!("Absence sweep scheduler disabled");
        return None;
    }

    info!(interval_secs, "Starting absence sweep scheduler");
    Some(rt::spawn(async move {
        let mut ticker = time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            run_sweep(&service).await;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;

    use crate::attendance::AttendancePolicy;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;

    fn service_at(hour: u32) -> AttendanceService {
        let store = Arc::new(MemoryStore::new());
        let now = NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        AttendanceService::new(
            store.clone(),
            store,
            Arc::new(FixedClock::new(now)),
            AttendancePolicy::default(),
        )
    }

    #[actix_web::test]
    async fn sweep_outcome_depends_on_cutoff() {
        assert_eq!(run_sweep(&service_at(9)).await, Some(SweepOutcome::Deferred));
        assert_eq!(
            run_sweep(&service_at(13)).await,
            Some(SweepOutcome::Completed { count: 0 })
        );
    }

    #[actix_web::test]
    async fn zero_interval_disables_scheduler() {
        assert!(spawn_absence_sweep(service_at(13), 0).is_none());
    }
}
