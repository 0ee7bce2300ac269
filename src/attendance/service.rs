use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::attendance::dashboard::{
    self, EmployeeDashboard, EmployeeDayStatus, ManagerDashboard, TodayStatus,
};
use crate::attendance::engine::{self, AbsenceOutcome, SweepWindow};
use crate::attendance::error::AttendanceError;
use crate::attendance::export;
use crate::attendance::policy::AttendancePolicy;
use crate::attendance::summary::{self, AttendanceSummary, TeamSummary};
use crate::clock::Clock;
use crate::model::attendance::{AttendanceEntry, AttendanceRecord};
use crate::store::{AttendanceStore, EmployeeFilter, RecordFilter, StoreError, UserStore};

/// Attempts for a single (user, day) write before surfacing `RecordConflict`.
const WRITE_ATTEMPTS: usize = 2;
const RECENT_DAYS: i64 = 7;
const TREND_DAYS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The sweep was asked to run for today before the absence cutoff.
    Deferred,
    /// `count` employees had no check-in for the date and are now absent.
    Completed { count: usize },
}

#[derive(Clone)]
pub struct AttendanceService {
    users: Arc<dyn UserStore>,
    records: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    policy: AttendancePolicy,
}

impl AttendanceService {
    pub fn new(
        users: Arc<dyn UserStore>,
        records: Arc<dyn AttendanceStore>,
        clock: Arc<dyn Clock>,
        policy: AttendancePolicy,
    ) -> Self {
        Self {
            users,
            records,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    #[instrument(skip(self))]
    pub async fn check_in(&self, user_id: u64) -> Result<AttendanceRecord, AttendanceError> {
        let now = self.clock.now();

        for _ in 0..WRITE_ATTEMPTS {
            let existing = self.records.find_record(user_id, now.date()).await?;
            let record = engine::apply_check_in(existing.as_ref(), user_id, now, &self.policy)?;

            match self.save_check_in(existing.is_some(), &record).await {
                Ok(()) => {
                    info!(status = %record.status, "Checked in");
                    return Ok(record);
                }
                Err(StoreError::Conflict) => {
                    warn!("Check-in raced with another write, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AttendanceError::RecordConflict)
    }

    #[instrument(skip(self))]
    pub async fn check_out(&self, user_id: u64) -> Result<AttendanceRecord, AttendanceError> {
        let now = self.clock.now();

        for _ in 0..WRITE_ATTEMPTS {
            let existing = self.records.find_record(user_id, now.date()).await?;
            let record = engine::apply_check_out(existing.as_ref(), now, &self.policy)?;

            if self.records.record_check_out(&record).await? {
                info!(status = %record.status, total_hours = ?record.total_hours, "Checked out");
                return Ok(record);
            }
            warn!("Check-out raced with another write, re-reading");
        }
        Err(AttendanceError::RecordConflict)
    }

    pub async fn today_status(&self, user_id: u64) -> Result<TodayStatus, AttendanceError> {
        let record = self.records.find_record(user_id, self.clock.today()).await?;
        Ok(TodayStatus::from(record))
    }

    /// The user's records in a month, newest first.
    pub async fn history(
        &self,
        user_id: u64,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let (start, end) = summary::resolve_period(month, year, self.clock.today())?;
        let entries = self.user_records(user_id, start, end).await?;
        Ok(entries.into_iter().map(|e| e.record).collect())
    }

    pub async fn monthly_summary(
        &self,
        user_id: u64,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<AttendanceSummary, AttendanceError> {
        let (start, end) = summary::resolve_period(month, year, self.clock.today())?;
        let entries = self.user_records(user_id, start, end).await?;
        Ok(summary::summarize(entries.iter().map(|e| &e.record)))
    }

    pub async fn team_summary(
        &self,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<TeamSummary, AttendanceError> {
        let (start, end) = summary::resolve_period(month, year, self.clock.today())?;
        let filter = RecordFilter {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        };
        let entries = self.records.query_records(&filter).await?;
        Ok(summary::summarize_team(entries.iter().map(|e| &e.record)))
    }

    /// Marks every employee without a check-in on `date` (default: today) as
    /// absent. Each employee is an independent write, so a failed run can simply
    /// be repeated.
    #[instrument(skip(self))]
    pub async fn mark_absent_sweep(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<SweepOutcome, AttendanceError> {
        let now = self.clock.now();
        let date = date.unwrap_or(now.date());

        if engine::sweep_window(date, now, &self.policy)? == SweepWindow::TooEarly {
            debug!(%date, "Absence sweep deferred until cutoff");
            return Ok(SweepOutcome::Deferred);
        }

        let employees = self.users.list_employees(&EmployeeFilter::default()).await?;
        let mut count = 0;
        for employee in &employees {
            if self.mark_absent(employee.id, date, now).await? {
                count += 1;
            }
        }

        info!(%date, count, employees = employees.len(), "Absence sweep completed");
        Ok(SweepOutcome::Completed { count })
    }

    /// Returns true when the employee has no check-in for `date`.
    async fn mark_absent(
        &self,
        user_id: u64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<bool, AttendanceError> {
        for _ in 0..WRITE_ATTEMPTS {
            let existing = self.records.find_record(user_id, date).await?;
            let outcome = engine::mark_absent_if_unchecked_in(
                existing.as_ref(),
                user_id,
                date,
                now,
                &self.policy,
            )?;

            match outcome {
                AbsenceOutcome::Deferred | AbsenceOutcome::CheckedIn => return Ok(false),
                AbsenceOutcome::AlreadyAbsent => return Ok(true),
                AbsenceOutcome::Mark(_) if existing.is_some() => {
                    // Guarded update: a check-in landing in between wins.
                    if self.records.mark_absent(user_id, date).await? {
                        return Ok(true);
                    }
                    debug!(user_id, %date, "Record changed during sweep, re-reading");
                }
                AbsenceOutcome::Mark(record) => match self.records.insert_record(&record).await {
                    Ok(()) => return Ok(true),
                    Err(StoreError::Conflict) => {
                        debug!(user_id, %date, "Record created during sweep, re-reading");
                    }
                    Err(e) => return Err(e.into()),
                },
            }
        }
        Err(AttendanceError::RecordConflict)
    }

    pub async fn list_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceEntry>, AttendanceError> {
        Ok(self.records.query_records(filter).await?)
    }

    pub async fn employee_records(
        &self,
        user_id: u64,
    ) -> Result<Vec<AttendanceEntry>, AttendanceError> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(AttendanceError::NotFound("Employee not found".into()));
        }
        let filter = RecordFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        Ok(self.records.query_records(&filter).await?)
    }

    /// `attendance_<epoch millis>.csv`, stamped with the current time.
    pub fn export_file_name(&self) -> String {
        format!("attendance_{}.csv", self.clock.timestamp_millis())
    }

    pub async fn export(&self, filter: &RecordFilter) -> Result<Vec<u8>, AttendanceError> {
        let entries = self.records.query_records(filter).await?;
        if entries.is_empty() {
            return Err(AttendanceError::NotFound("No data to export".into()));
        }
        info!(rows = entries.len(), "Exporting attendance");
        export::render_csv(&entries)
    }

    pub async fn today_overview(&self) -> Result<Vec<EmployeeDayStatus>, AttendanceError> {
        let today = self.clock.today();
        let employees = self.users.list_employees(&EmployeeFilter::default()).await?;
        let filter = RecordFilter {
            start_date: Some(today),
            end_date: Some(today),
            ..Default::default()
        };
        let records = self.plain_records(&filter).await?;
        Ok(dashboard::today_overview(&employees, &records, today))
    }

    pub async fn employee_dashboard(
        &self,
        user_id: u64,
    ) -> Result<EmployeeDashboard, AttendanceError> {
        let today = self.clock.today();
        let today_record = self.records.find_record(user_id, today).await?;
        let monthly_summary = self.monthly_summary(user_id, None, None).await?;
        let recent = self
            .user_records(user_id, today - Duration::days(RECENT_DAYS), today)
            .await?;

        Ok(EmployeeDashboard {
            today: TodayStatus::from(today_record),
            monthly_summary,
            recent_attendance: recent.into_iter().map(|e| e.record).collect(),
        })
    }

    pub async fn manager_dashboard(
        &self,
        department: Option<String>,
    ) -> Result<ManagerDashboard, AttendanceError> {
        let today = self.clock.today();
        let employees = self
            .users
            .list_employees(&EmployeeFilter {
                department: department.clone(),
                search: None,
            })
            .await?;
        let filter = RecordFilter {
            department,
            start_date: Some(today - Duration::days(TREND_DAYS)),
            end_date: Some(today),
            ..Default::default()
        };
        let records = self.plain_records(&filter).await?;
        Ok(dashboard::build_manager_dashboard(&employees, &records, today))
    }

    /// Inserts the day's first row, or fills in the check-in of a swept row.
    /// Either write fails with `Conflict` when another write got there first.
    async fn save_check_in(
        &self,
        exists: bool,
        record: &AttendanceRecord,
    ) -> Result<(), StoreError> {
        if !exists {
            return self.records.insert_record(record).await;
        }
        if self.records.record_check_in(record).await? {
            Ok(())
        } else {
            Err(StoreError::Conflict)
        }
    }

    async fn user_records(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceEntry>, AttendanceError> {
        let filter = RecordFilter {
            user_id: Some(user_id),
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        };
        Ok(self.records.query_records(&filter).await?)
    }

    async fn plain_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let entries = self.records.query_records(filter).await?;
        Ok(entries.into_iter().map(|e| e.record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::attendance::AttendanceStatus;
    use crate::model::role::Role;
    use crate::model::user::NewUser;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        service: AttendanceService,
    }

    fn fixture(now: NaiveDateTime) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(now));
        let service = AttendanceService::new(
            store.clone(),
            store.clone(),
            clock.clone(),
            AttendancePolicy::default(),
        );
        Fixture {
            store,
            clock,
            service,
        }
    }

    async fn add_user(store: &MemoryStore, name: &str, role: Role) -> u64 {
        let count = store.count_users().await.unwrap();
        store
            .insert_user(NewUser {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".into(),
                role,
                employee_id: crate::model::user::employee_code(count),
                department: Some("Engineering".into()),
            })
            .await
            .unwrap()
            .id
    }

    #[actix_web::test]
    async fn on_time_check_in_then_early_check_out_is_half_day() {
        let f = fixture(at(10, 9, 30));
        let alice = add_user(&f.store, "Alice", Role::Employee).await;

        let record = f.service.check_in(alice).await.unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);

        f.clock.set(at(10, 13, 0));
        let record = f.service.check_out(alice).await.unwrap();
        assert_eq!(record.status, AttendanceStatus::HalfDay);
        assert_eq!(record.total_hours, Some(3.5));

        let stored = f.store.find_record(alice, at(10, 0, 0).date()).await.unwrap();
        assert_eq!(stored, Some(record));
    }

    #[actix_web::test]
    async fn late_check_in_with_full_day_stays_late() {
        let f = fixture(at(10, 10, 15));
        let bob = add_user(&f.store, "Bob", Role::Employee).await;

        f.service.check_in(bob).await.unwrap();
        f.clock.set(at(10, 18, 0));
        let record = f.service.check_out(bob).await.unwrap();

        assert_eq!(record.status, AttendanceStatus::Late);
        assert_eq!(record.total_hours, Some(7.75));
    }

    #[actix_web::test]
    async fn duplicate_actions_are_rejected() {
        let f = fixture(at(10, 9, 0));
        let alice = add_user(&f.store, "Alice", Role::Employee).await;

        assert!(matches!(
            f.service.check_out(alice).await,
            Err(AttendanceError::NotCheckedIn)
        ));

        f.service.check_in(alice).await.unwrap();
        assert!(matches!(
            f.service.check_in(alice).await,
            Err(AttendanceError::AlreadyCheckedIn)
        ));

        f.clock.set(at(10, 17, 0));
        f.service.check_out(alice).await.unwrap();
        assert!(matches!(
            f.service.check_out(alice).await,
            Err(AttendanceError::AlreadyCheckedOut)
        ));
    }

    #[actix_web::test]
    async fn today_status_tracks_progress() {
        let f = fixture(at(10, 9, 0));
        let alice = add_user(&f.store, "Alice", Role::Employee).await;

        let status = f.service.today_status(alice).await.unwrap();
        assert!(!status.checked_in && status.attendance.is_none());

        f.service.check_in(alice).await.unwrap();
        let status = f.service.today_status(alice).await.unwrap();
        assert!(status.checked_in && !status.checked_out);
    }

    #[actix_web::test]
    async fn sweep_before_noon_is_deferred_and_writes_nothing() {
        let f = fixture(at(10, 11, 0));
        let alice = add_user(&f.store, "Alice", Role::Employee).await;

        let outcome = f.service.mark_absent_sweep(None).await.unwrap();

        assert_eq!(outcome, SweepOutcome::Deferred);
        assert_eq!(f.store.find_record(alice, at(10, 0, 0).date()).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn sweep_marks_only_unchecked_employees_and_is_idempotent() {
        let f = fixture(at(10, 9, 0));
        let alice = add_user(&f.store, "Alice", Role::Employee).await;
        let bob = add_user(&f.store, "Bob", Role::Employee).await;
        let manager = add_user(&f.store, "Mona", Role::Manager).await;
        f.service.check_in(alice).await.unwrap();

        f.clock.set(at(10, 12, 30));
        let first = f.service.mark_absent_sweep(None).await.unwrap();
        let snapshot = f.store.query_records(&RecordFilter::default()).await.unwrap();
        let second = f.service.mark_absent_sweep(None).await.unwrap();
        let after = f.store.query_records(&RecordFilter::default()).await.unwrap();

        assert_eq!(first, SweepOutcome::Completed { count: 1 });
        assert_eq!(second, first);
        assert_eq!(snapshot, after);

        let day = at(10, 0, 0).date();
        let alice_record = f.store.find_record(alice, day).await.unwrap().unwrap();
        assert_eq!(alice_record.status, AttendanceStatus::Present);
        let bob_record = f.store.find_record(bob, day).await.unwrap().unwrap();
        assert_eq!(bob_record, AttendanceRecord::absent(bob, day));
        assert_eq!(f.store.find_record(manager, day).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn check_in_after_sweep_replaces_absence() {
        let f = fixture(at(10, 12, 30));
        let bob = add_user(&f.store, "Bob", Role::Employee).await;
        f.service.mark_absent_sweep(None).await.unwrap();

        f.clock.set(at(10, 12, 45));
        let record = f.service.check_in(bob).await.unwrap();

        assert_eq!(record.status, AttendanceStatus::Late);
        let summary = f.service.monthly_summary(bob, None, None).await.unwrap();
        assert_eq!(summary.absent, 0);
        assert_eq!(summary.late, 1);
    }

    #[actix_web::test]
    async fn sweep_for_a_past_date_runs_in_the_morning() {
        let f = fixture(at(11, 8, 0));
        let bob = add_user(&f.store, "Bob", Role::Employee).await;

        let outcome = f
            .service
            .mark_absent_sweep(Some(at(10, 0, 0).date()))
            .await
            .unwrap();

        assert_eq!(outcome, SweepOutcome::Completed { count: 1 });
        assert!(f.store.find_record(bob, at(10, 0, 0).date()).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn summaries_cover_the_requested_month() {
        let f = fixture(at(2, 9, 0));
        let alice = add_user(&f.store, "Alice", Role::Employee).await;
        let bob = add_user(&f.store, "Bob", Role::Employee).await;

        f.service.check_in(alice).await.unwrap();
        f.clock.set(at(2, 17, 0));
        f.service.check_out(alice).await.unwrap();

        f.clock.set(at(3, 10, 30));
        f.service.check_in(alice).await.unwrap();
        f.service.check_in(bob).await.unwrap();

        f.clock.set(at(3, 12, 0));
        f.service.mark_absent_sweep(Some(at(2, 0, 0).date())).await.unwrap();

        let mine = f.service.monthly_summary(alice, Some(3), Some(2026)).await.unwrap();
        assert_eq!(mine.present, 2);
        assert_eq!(mine.late, 1);
        assert_eq!(mine.total_hours, 8.0);

        let team = f.service.team_summary(None, None).await.unwrap();
        assert_eq!(team.total_employees, 2);
        assert_eq!(team.summary.present, 3);
        assert_eq!(team.summary.absent, 1);
        assert!(team.summary.late <= team.summary.present);

        let history = f.service.history(alice, None, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].date > history[1].date);

        let other_month = f.service.monthly_summary(alice, Some(4), Some(2026)).await.unwrap();
        assert_eq!(other_month, AttendanceSummary::default());

        assert!(matches!(
            f.service.monthly_summary(alice, Some(13), None).await,
            Err(AttendanceError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn export_without_rows_is_not_found() {
        let f = fixture(at(10, 9, 0));
        let err = f.service.export(&RecordFilter::default()).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound(_)));

        let alice = add_user(&f.store, "Alice", Role::Employee).await;
        f.service.check_in(alice).await.unwrap();
        let csv = f.service.export(&RecordFilter::default()).await.unwrap();
        assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 2);
    }

    #[test]
    fn export_file_name_uses_epoch_millis() {
        use chrono::{Local, TimeZone};

        let f = fixture(at(10, 9, 0));
        let millis = Local
            .from_local_datetime(&at(10, 9, 0))
            .single()
            .unwrap()
            .timestamp_millis();

        assert_eq!(f.service.export_file_name(), format!("attendance_{millis}.csv"));
        f.clock.set(at(10, 9, 1));
        assert_eq!(
            f.service.export_file_name(),
            format!("attendance_{}.csv", millis + 1000)
        );
    }

    #[actix_web::test]
    async fn employee_records_require_known_user() {
        let f = fixture(at(10, 9, 0));
        assert!(matches!(
            f.service.employee_records(42).await,
            Err(AttendanceError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn dashboards_reflect_today() {
        let f = fixture(at(10, 10, 20));
        let alice = add_user(&f.store, "Alice", Role::Employee).await;
        add_user(&f.store, "Bob", Role::Employee).await;
        f.service.check_in(alice).await.unwrap();

        let manager = f.service.manager_dashboard(None).await.unwrap();
        assert_eq!(manager.total_employees, 2);
        assert_eq!(manager.today_attendance.present, 1);
        assert_eq!(manager.today_attendance.late, 1);
        assert_eq!(manager.absent_today[0].name, "Bob");

        let filtered = f
            .service
            .manager_dashboard(Some("Sales".into()))
            .await
            .unwrap();
        assert_eq!(filtered.total_employees, 0);

        let mine = f.service.employee_dashboard(alice).await.unwrap();
        assert!(mine.today.checked_in);
        assert_eq!(mine.monthly_summary.late, 1);
        assert_eq!(mine.recent_attendance.len(), 1);

        let overview = f.service.today_overview().await.unwrap();
        assert_eq!(overview.len(), 2);
        assert_eq!(overview[1].status, None);
    }

    /// Delegates to a memory store, but the first insert loses a race against a
    /// concurrent absence sweep for the same day.
    struct RacingStore {
        inner: Arc<MemoryStore>,
        raced: AtomicBool,
    }

    #[async_trait]
    impl AttendanceStore for RacingStore {
        async fn find_record(
            &self,
            user_id: u64,
            date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            self.inner.find_record(user_id, date).await
        }

        async fn insert_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner
                    .insert_record(&AttendanceRecord::absent(record.user_id, record.date))
                    .await?;
            }
            self.inner.insert_record(record).await
        }

        async fn record_check_in(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
            self.inner.record_check_in(record).await
        }

        async fn record_check_out(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
            self.inner.record_check_out(record).await
        }

        async fn mark_absent(&self, user_id: u64, date: NaiveDate) -> Result<bool, StoreError> {
            self.inner.mark_absent(user_id, date).await
        }

        async fn query_records(
            &self,
            filter: &RecordFilter,
        ) -> Result<Vec<AttendanceEntry>, StoreError> {
            self.inner.query_records(filter).await
        }
    }

    #[actix_web::test]
    async fn check_in_recovers_from_insert_conflict() {
        let store = Arc::new(MemoryStore::new());
        let alice = add_user(&store, "Alice", Role::Employee).await;
        let racing = Arc::new(RacingStore {
            inner: store.clone(),
            raced: AtomicBool::new(false),
        });
        let service = AttendanceService::new(
            store.clone(),
            racing,
            Arc::new(FixedClock::new(at(10, 12, 5))),
            AttendancePolicy::default(),
        );

        let record = service.check_in(alice).await.unwrap();

        assert_eq!(record.status, AttendanceStatus::Late);
        let stored = store.find_record(alice, at(10, 0, 0).date()).await.unwrap();
        assert_eq!(stored, Some(record));
    }

    /// Serves one out-of-date snapshot to the next read, as a replica lagging
    /// behind a concurrent request would, then delegates.
    struct StaleStore {
        inner: Arc<MemoryStore>,
        snapshot: Mutex<Option<AttendanceRecord>>,
    }

    impl StaleStore {
        fn service(
            inner: Arc<MemoryStore>,
            snapshot: AttendanceRecord,
            now: NaiveDateTime,
        ) -> AttendanceService {
            let stale = Arc::new(StaleStore {
                inner: inner.clone(),
                snapshot: Mutex::new(Some(snapshot)),
            });
            AttendanceService::new(
                inner,
                stale,
                Arc::new(FixedClock::new(now)),
                AttendancePolicy::default(),
            )
        }
    }

    #[async_trait]
    impl AttendanceStore for StaleStore {
        async fn find_record(
            &self,
            user_id: u64,
            date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            let snapshot = self.snapshot.lock().unwrap().take();
            if snapshot.is_some() {
                return Ok(snapshot);
            }
            self.inner.find_record(user_id, date).await
        }

        async fn insert_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
            self.inner.insert_record(record).await
        }

        async fn record_check_in(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
            self.inner.record_check_in(record).await
        }

        async fn record_check_out(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
            self.inner.record_check_out(record).await
        }

        async fn mark_absent(&self, user_id: u64, date: NaiveDate) -> Result<bool, StoreError> {
            self.inner.mark_absent(user_id, date).await
        }

        async fn query_records(
            &self,
            filter: &RecordFilter,
        ) -> Result<Vec<AttendanceEntry>, StoreError> {
            self.inner.query_records(filter).await
        }
    }

    #[actix_web::test]
    async fn concurrent_check_in_on_swept_row_keeps_the_first() {
        let f = fixture(at(10, 12, 30));
        let bob = add_user(&f.store, "Bob", Role::Employee).await;
        let day = at(10, 0, 0).date();
        f.service.mark_absent_sweep(None).await.unwrap();
        let swept = f.store.find_record(bob, day).await.unwrap().unwrap();

        f.service.check_in(bob).await.unwrap();
        let racer = StaleStore::service(f.store.clone(), swept, at(10, 12, 45));

        assert!(matches!(
            racer.check_in(bob).await,
            Err(AttendanceError::AlreadyCheckedIn)
        ));
        let stored = f.store.find_record(bob, day).await.unwrap().unwrap();
        assert_eq!(stored.check_in_time, Some(at(10, 12, 30)));
    }

    #[actix_web::test]
    async fn concurrent_check_out_keeps_the_first() {
        let f = fixture(at(10, 9, 0));
        let alice = add_user(&f.store, "Alice", Role::Employee).await;
        let day = at(10, 0, 0).date();
        let checked_in = f.service.check_in(alice).await.unwrap();

        f.clock.set(at(10, 17, 0));
        f.service.check_out(alice).await.unwrap();
        let racer = StaleStore::service(f.store.clone(), checked_in, at(10, 18, 0));

        assert!(matches!(
            racer.check_out(alice).await,
            Err(AttendanceError::AlreadyCheckedOut)
        ));
        let stored = f.store.find_record(alice, day).await.unwrap().unwrap();
        assert_eq!(stored.check_out_time, Some(at(10, 17, 0)));
        assert_eq!(stored.total_hours, Some(8.0));
    }
}
