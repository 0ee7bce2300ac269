use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// A stored account. `password` holds the argon2 PHC string.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub employee_id: String,
    pub department: Option<String>,
    pub date_of_joining: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub work_location: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 2,
    "name": "Alice Smith",
    "email": "alice@example.com",
    "role": "employee",
    "employee_id": "EMP001",
    "department": "Engineering",
    "date_of_joining": "2024-01-01",
    "contact_number": null,
    "address": null,
    "work_location": "Berlin"
}))]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub employee_id: String,
    pub department: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub date_of_joining: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub work_location: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            employee_id: user.employee_id.clone(),
            department: user.department.clone(),
            date_of_joining: user.date_of_joining,
            contact_number: user.contact_number.clone(),
            address: user.address.clone(),
            work_location: user.work_location.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub employee_id: String,
    pub department: Option<String>,
}

/// Profile edits. The outer `Option` marks a field as supplied, the inner one
/// allows clearing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub contact_number: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub work_location: Option<Option<String>>,
    pub date_of_joining: Option<Option<NaiveDate>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.contact_number.is_none()
            && self.address.is_none()
            && self.work_location.is_none()
            && self.date_of_joining.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(contact_number) = &self.contact_number {
            user.contact_number = contact_number.clone();
        }
        if let Some(address) = &self.address {
            user.address = address.clone();
        }
        if let Some(work_location) = &self.work_location {
            user.work_location = work_location.clone();
        }
        if let Some(date_of_joining) = self.date_of_joining {
            user.date_of_joining = date_of_joining;
        }
    }
}

/// Generates the next human-readable employee code, `EMP001` style.
pub fn employee_code(existing_users: u64) -> String {
    format!("EMP{:03}", existing_users + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_codes_are_zero_padded() {
        assert_eq!(employee_code(0), "EMP001");
        assert_eq!(employee_code(41), "EMP042");
        assert_eq!(employee_code(1234), "EMP1235");
    }

    #[test]
    fn profile_changes_clear_and_set_fields() {
        let mut user = User {
            id: 1,
            name: "Old".into(),
            email: "a@b.c".into(),
            password: String::new(),
            role: Role::Employee,
            employee_id: "EMP001".into(),
            department: None,
            date_of_joining: None,
            contact_number: Some("123".into()),
            address: None,
            work_location: None,
            created_at: None,
        };
        let changes = ProfileChanges {
            name: Some("New".into()),
            contact_number: Some(None),
            work_location: Some(Some("Remote".into())),
            ..Default::default()
        };

        changes.apply_to(&mut user);

        assert_eq!(user.name, "New");
        assert_eq!(user.contact_number, None);
        assert_eq!(user.work_location.as_deref(), Some("Remote"));
        assert!(!changes.is_empty());
        assert!(ProfileChanges::default().is_empty());
    }
}
