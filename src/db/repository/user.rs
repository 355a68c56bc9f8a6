use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_datetime, parse_datetime};
use crate::db::{is_unique_violation, DatabaseError};
use crate::models::*;

const USER_COLUMNS: &str =
    "id, email, name, password, is_active, is_staff, is_superuser, last_login, date_joined";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let last_login = match row.get::<_, Option<String>>(7)? {
        Some(raw) => Some(parse_datetime(7, &raw)?),
        None => None,
    };
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password: row.get(3)?,
        is_active: row.get::<_, i32>(4)? != 0,
        is_staff: row.get::<_, i32>(5)? != 0,
        is_superuser: row.get::<_, i32>(6)? != 0,
        last_login,
        date_joined: parse_datetime(8, &row.get::<_, String>(8)?)?,
    })
}

/// Insert an account. The email must be unique across the directory.
pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<User, DatabaseError> {
    user.validate()?;
    let joined = chrono::Local::now().naive_local();

    conn.execute(
        "INSERT INTO users (email, name, password, is_active, is_staff, is_superuser, date_joined)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.email,
            user.name,
            user.password,
            user.is_active as i32,
            user.is_staff as i32,
            user.is_superuser as i32,
            format_datetime(&joined),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            DatabaseError::UniqueViolation {
                entity_type: "user".into(),
                field: "email".into(),
                value: user.email.clone(),
            }
        } else {
            e.into()
        }
    })?;

    let id = conn.last_insert_rowid();
    get_user(conn, id)?.ok_or_else(|| DatabaseError::not_found("user", id))
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], user_from_row).optional()?)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    Ok(conn.query_row(&sql, params![email], user_from_row).optional()?)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_user_name(conn: &Connection, id: i64, name: &str) -> Result<(), DatabaseError> {
    crate::validation::max_length("name", name, crate::validation::NAME_MAX_LENGTH)?;
    let updated = conn.execute("UPDATE users SET name = ?1 WHERE id = ?2", params![name, id])?;
    if updated == 0 {
        return Err(DatabaseError::not_found("user", id));
    }
    Ok(())
}

pub fn update_user_permissions(
    conn: &Connection,
    id: i64,
    flags: PermissionFlags,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET is_active = ?1, is_staff = ?2, is_superuser = ?3 WHERE id = ?4",
        params![
            flags.is_active as i32,
            flags.is_staff as i32,
            flags.is_superuser as i32,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("user", id));
    }
    Ok(())
}

/// Store an already-encoded password hash.
pub fn set_user_password(conn: &Connection, id: i64, encoded: &str) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET password = ?1 WHERE id = ?2",
        params![encoded, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("user", id));
    }
    Ok(())
}

pub fn record_login(conn: &Connection, id: i64, at: &NaiveDateTime) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE users SET last_login = ?1 WHERE id = ?2",
        params![format_datetime(at), id],
    )?;
    Ok(())
}
