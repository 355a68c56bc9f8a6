use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<NaiveDateTime>,
    pub date_joined: NaiveDateTime,
}

impl User {
    /// Canonical locator of the account's detail view.
    pub fn absolute_url(&self) -> String {
        format!("/users/{}/", self.id)
    }

    pub fn has_usable_password(&self) -> bool {
        !self.password.starts_with('!')
    }
}

/// Insert payload. `password` is the already-encoded hash.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_email(&self.email)?;
        validation::max_length("name", &self.name, validation::NAME_MAX_LENGTH)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}
