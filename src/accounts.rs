//! User directory: account creation and credential checks.
//!
//! Accounts are keyed by email; there is no username. Passwords are hashed
//! here before they reach the repository, so the database never sees a
//! plaintext credential.

use chrono::SubsecRound;
use rusqlite::Connection;
use thiserror::Error;

use crate::crypto::{self, CryptoError, PasswordHasher};
use crate::db::{self, DatabaseError};
use crate::models::{NewUser, PermissionFlags, User};
use crate::validation::normalize_email;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Account creation request.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: Option<String>,
    pub name: String,
}

impl Registration {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Some(password.into()),
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Create a regular, active account.
pub fn create_user(
    conn: &Connection,
    hasher: &PasswordHasher,
    registration: &Registration,
) -> Result<User, AccountError> {
    create_with_flags(conn, hasher, registration, PermissionFlags {
        is_active: true,
        is_staff: false,
        is_superuser: false,
    })
}

/// Create an active account with staff and superuser rights.
pub fn create_superuser(
    conn: &Connection,
    hasher: &PasswordHasher,
    registration: &Registration,
) -> Result<User, AccountError> {
    create_with_flags(conn, hasher, registration, PermissionFlags {
        is_active: true,
        is_staff: true,
        is_superuser: true,
    })
}

fn create_with_flags(
    conn: &Connection,
    hasher: &PasswordHasher,
    registration: &Registration,
    flags: PermissionFlags,
) -> Result<User, AccountError> {
    let email = normalize_email(&registration.email);
    let password = match &registration.password {
        Some(raw) => hasher.encode(raw),
        None => crypto::unusable_password(),
    };

    let user = db::insert_user(conn, &NewUser {
        email,
        name: registration.name.clone(),
        password,
        is_active: flags.is_active,
        is_staff: flags.is_staff,
        is_superuser: flags.is_superuser,
    })?;

    tracing::info!(user_id = user.id, staff = user.is_staff, "Account created");
    Ok(user)
}

/// Resolve credentials to an active account.
///
/// Unknown email, wrong password and inactive accounts all yield `None`.
/// A successful check stamps `last_login`.
pub fn authenticate(
    conn: &Connection,
    email: &str,
    password: &str,
) -> Result<Option<User>, AccountError> {
    let Some(mut user) = find_login_account(conn, email)? else {
        return Ok(None);
    };
    if !verify_credentials(&user, password)? {
        return Ok(None);
    }
    stamp_login(conn, &mut user)?;
    Ok(Some(user))
}

/// Look up the account a login attempt names.
pub fn find_login_account(conn: &Connection, email: &str) -> Result<Option<User>, AccountError> {
    let user = db::get_user_by_email(conn, &normalize_email(email))?;
    if user.is_none() {
        tracing::warn!("Authentication failed: unknown account");
    }
    Ok(user)
}

/// Check a password against an account already loaded.
///
/// Needs no connection, so callers can run the hash off the database lock.
pub fn verify_credentials(user: &User, password: &str) -> Result<bool, AccountError> {
    if !crypto::verify_password(password, &user.password)? || !user.is_active {
        tracing::warn!(user_id = user.id, "Authentication failed");
        return Ok(false);
    }
    Ok(true)
}

/// Record a successful login on the row and on `user`.
pub fn stamp_login(conn: &Connection, user: &mut User) -> Result<(), AccountError> {
    // Stored at second precision.
    let now = chrono::Local::now().naive_local().trunc_subsecs(0);
    db::record_login(conn, user.id, &now)?;
    user.last_login = Some(now);
    Ok(())
}

/// Replace an account's password.
pub fn change_password(
    conn: &Connection,
    hasher: &PasswordHasher,
    user_id: i64,
    new_password: &str,
) -> Result<(), AccountError> {
    db::set_user_password(conn, user_id, &hasher.encode(new_password))?;
    tracing::info!(user_id, "Password changed");
    Ok(())
}

/// Create the superuser unless an account with that email already exists.
///
/// Returns the created account, or `None` when it was already present.
pub fn ensure_superuser(
    conn: &Connection,
    hasher: &PasswordHasher,
    registration: &Registration,
) -> Result<Option<User>, AccountError> {
    let email = normalize_email(&registration.email);
    if db::get_user_by_email(conn, &email)?.is_some() {
        return Ok(None);
    }
    create_superuser(conn, hasher, registration).map(Some)
}

/// Locator of the account's detail view.
pub fn absolute_url(user: &User) -> String {
    user.absolute_url()
}
