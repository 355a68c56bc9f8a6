use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ensure_exists, format_datetime, parse_datetime};
use crate::db::DatabaseError;
use crate::models::enums::EntityKind;
use crate::models::*;

const COMMUNICATION_COLUMNS: &str =
    "id, customer_id, government_official_id, message_content, timestamp";

fn communication_from_row(row: &Row) -> rusqlite::Result<Communication> {
    Ok(Communication {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        government_official_id: row.get(2)?,
        message_content: row.get(3)?,
        timestamp: parse_datetime(4, &row.get::<_, String>(4)?)?,
    })
}

pub fn insert_communication(
    conn: &Connection,
    comm: &NewCommunication,
) -> Result<Communication, DatabaseError> {
    comm.validate()?;
    ensure_exists(conn, EntityKind::Customer, comm.customer_id)?;
    ensure_exists(conn, EntityKind::GovernmentOfficial, comm.government_official_id)?;

    conn.execute(
        "INSERT INTO communications (customer_id, government_official_id, message_content, timestamp)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            comm.customer_id,
            comm.government_official_id,
            comm.message_content,
            format_datetime(&comm.timestamp),
        ],
    )?;

    Ok(Communication {
        id: conn.last_insert_rowid(),
        customer_id: comm.customer_id,
        government_official_id: comm.government_official_id,
        message_content: comm.message_content.clone(),
        timestamp: comm.timestamp,
    })
}

pub fn get_communication(conn: &Connection, id: i64) -> Result<Option<Communication>, DatabaseError> {
    let sql = format!("SELECT {COMMUNICATION_COLUMNS} FROM communications WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], communication_from_row).optional()?)
}

fn query_communications(conn: &Connection, column: &str, value: i64) -> Result<Vec<Communication>, DatabaseError> {
    let sql = format!(
        "SELECT {COMMUNICATION_COLUMNS} FROM communications WHERE {column} = ?1
         ORDER BY timestamp DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![value], communication_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Messages addressed to a customer, newest first.
pub fn list_communications_for_customer(
    conn: &Connection,
    customer_id: i64,
) -> Result<Vec<Communication>, DatabaseError> {
    query_communications(conn, "customer_id", customer_id)
}

/// Messages sent by an official, newest first.
pub fn list_communications_for_official(
    conn: &Connection,
    government_official_id: i64,
) -> Result<Vec<Communication>, DatabaseError> {
    query_communications(conn, "government_official_id", government_official_id)
}
