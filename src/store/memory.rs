use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::role::Role;
use crate::model::user::{NewUser, ProfileChanges, User, UserProfile};
use crate::store::{
    AttendanceStore, EmployeeFilter, RecordFilter, StoreError, UserStore, matches_search,
};

#[derive(Default)]
struct State {
    next_user_id: u64,
    users: BTreeMap<u64, User>,
    records: BTreeMap<(u64, NaiveDate), AttendanceRecord>,
}

/// Process-local store with the same uniqueness rules as the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

fn record_matches(filter: &RecordFilter, record: &AttendanceRecord, user: &User) -> bool {
    filter.user_id.is_none_or(|id| record.user_id == id)
        && filter
            .employee_code
            .as_ref()
            .is_none_or(|code| &user.employee_id == code)
        && filter
            .department
            .as_ref()
            .is_none_or(|d| user.department.as_ref() == Some(d))
        && filter.start_date.is_none_or(|start| record.date >= start)
        && filter.end_date.is_none_or(|end| record.date <= end)
        && filter.status.is_none_or(|status| record.status == status)
        && filter.search.as_ref().is_none_or(|needle| {
            matches_search(needle, &[&user.name, &user.employee_id, &user.email])
        })
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.users.len() as u64)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.write()?;
        let duplicate = state.users.values().any(|u| {
            u.email.eq_ignore_ascii_case(&user.email) || u.employee_id == user.employee_id
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }

        state.next_user_id += 1;
        let stored = User {
            id: state.next_user_id,
            name: user.name,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            employee_id: user.employee_id,
            department: user.department,
            date_of_joining: None,
            contact_number: None,
            address: None,
            work_location: None,
            created_at: Some(Local::now().naive_local()),
        };
        state.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_profile(
        &self,
        id: u64,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.write()?;
        Ok(state.users.get_mut(&id).map(|user| {
            changes.apply_to(user);
            user.clone()
        }))
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> Result<Vec<UserProfile>, StoreError> {
        let state = self.read()?;
        let mut employees: Vec<UserProfile> = state
            .users
            .values()
            .filter(|u| u.role == Role::Employee)
            .filter(|u| {
                filter
                    .department
                    .as_ref()
                    .is_none_or(|d| u.department.as_ref() == Some(d))
            })
            .filter(|u| {
                filter.search.as_ref().is_none_or(|needle| {
                    matches_search(needle, &[&u.name, &u.employee_id, &u.email])
                })
            })
            .map(UserProfile::from)
            .collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(employees)
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_record(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.read()?.records.get(&(user_id, date)).cloned())
    }

    async fn insert_record(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let key = (record.user_id, record.date);
        if state.records.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        state.records.insert(key, record.clone());
        Ok(())
    }

    async fn record_check_in(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.records.get_mut(&(record.user_id, record.date)) {
            Some(stored) if !stored.is_checked_in() => {
                stored.check_in_time = record.check_in_time;
                stored.status = record.status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.records.get_mut(&(record.user_id, record.date)) {
            Some(stored) if stored.is_checked_in() && !stored.is_checked_out() => {
                stored.check_out_time = record.check_out_time;
                stored.status = record.status;
                stored.total_hours = record.total_hours;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_absent(&self, user_id: u64, date: NaiveDate) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.records.get_mut(&(user_id, date)) {
            Some(record) if !record.is_checked_in() && record.status != AttendanceStatus::Absent => {
                record.status = AttendanceStatus::Absent;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn query_records(&self, filter: &RecordFilter) -> Result<Vec<AttendanceEntry>, StoreError> {
        let state = self.read()?;
        let mut entries: Vec<AttendanceEntry> = state
            .records
            .values()
            .filter_map(|record| {
                let user = state.users.get(&record.user_id)?;
                record_matches(filter, record, user).then(|| AttendanceEntry {
                    record: record.clone(),
                    name: user.name.clone(),
                    email: user.email.clone(),
                    employee_id: user.employee_id.clone(),
                    department: user.department.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.record
                .date
                .cmp(&a.record.date)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }
}
