//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection`; the caller owns the unit of
//! work. Cascading deletes are declared in the schema, so removing a parent
//! row never leaves children behind.

mod user;
mod profile;
mod disease;
mod appointment;
mod test_result;
mod statistics;
mod communication;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;
use crate::models::enums::EntityKind;

pub use user::*;
pub use profile::*;
pub use disease::*;
pub use appointment::*;
pub use test_result::*;
pub use statistics::*;
pub use communication::*;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Backing table for each entity.
pub fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "users",
        EntityKind::Customer => "customers",
        EntityKind::TestOperator => "test_operators",
        EntityKind::GovernmentOfficial => "government_officials",
        EntityKind::Doctor => "doctors",
        EntityKind::Disease => "diseases",
        EntityKind::Appointment => "appointments",
        EntityKind::TestResult => "test_results",
        EntityKind::Statistics => "statistics",
        EntityKind::Communication => "communications",
    }
}

pub(crate) fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_datetime(column: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

pub(crate) fn parse_date(column: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// Check that a row with `id` exists for `kind`.
pub fn exists(conn: &Connection, kind: EntityKind, id: i64) -> Result<bool, DatabaseError> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table_name(kind));
    let found = conn
        .query_row(&sql, params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Fail with `MissingReference` unless the parent row exists.
pub(crate) fn ensure_exists(conn: &Connection, kind: EntityKind, id: i64) -> Result<(), DatabaseError> {
    if exists(conn, kind, id)? {
        Ok(())
    } else {
        Err(DatabaseError::missing(kind.as_str(), id))
    }
}

/// Delete one row by id. Children go with it through `ON DELETE CASCADE`.
pub fn delete_entity(conn: &Connection, kind: EntityKind, id: i64) -> Result<(), DatabaseError> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", table_name(kind));
    let deleted = conn.execute(&sql, params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found(kind.as_str(), id));
    }
    tracing::debug!(entity = kind.as_str(), id, "Deleted row");
    Ok(())
}

pub fn count_rows(conn: &Connection, kind: EntityKind) -> Result<i64, DatabaseError> {
    let sql = format!("SELECT COUNT(*) FROM {}", table_name(kind));
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}
