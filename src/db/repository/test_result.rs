use rusqlite::{params, Connection, OptionalExtension, Row};

use super::ensure_exists;
use crate::db::DatabaseError;
use crate::models::enums::EntityKind;
use crate::models::*;

const TEST_RESULT_SELECT: &str =
    "SELECT tr.id, tr.appointment_id, tr.result, tr.disease_id, COALESCE(d.name, '')
     FROM test_results tr JOIN diseases d ON d.id = tr.disease_id";

fn test_result_from_row(row: &Row) -> rusqlite::Result<TestResult> {
    Ok(TestResult {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        result: row.get(2)?,
        disease_id: row.get(3)?,
        disease_tested: row.get(4)?,
    })
}

pub fn insert_test_result(conn: &Connection, tr: &NewTestResult) -> Result<TestResult, DatabaseError> {
    tr.validate()?;
    ensure_exists(conn, EntityKind::Appointment, tr.appointment_id)?;
    ensure_exists(conn, EntityKind::Disease, tr.disease_id)?;

    conn.execute(
        "INSERT INTO test_results (appointment_id, result, disease_id) VALUES (?1, ?2, ?3)",
        params![tr.appointment_id, tr.result, tr.disease_id],
    )?;

    let id = conn.last_insert_rowid();
    get_test_result(conn, id)?.ok_or_else(|| DatabaseError::not_found("test_result", id))
}

pub fn get_test_result(conn: &Connection, id: i64) -> Result<Option<TestResult>, DatabaseError> {
    let sql = format!("{TEST_RESULT_SELECT} WHERE tr.id = ?1");
    Ok(conn.query_row(&sql, params![id], test_result_from_row).optional()?)
}

fn query_test_results(conn: &Connection, column: &str, value: i64) -> Result<Vec<TestResult>, DatabaseError> {
    let sql = format!("{TEST_RESULT_SELECT} WHERE tr.{column} = ?1 ORDER BY tr.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![value], test_result_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_test_results_for_appointment(
    conn: &Connection,
    appointment_id: i64,
) -> Result<Vec<TestResult>, DatabaseError> {
    query_test_results(conn, "appointment_id", appointment_id)
}

pub fn list_test_results_for_disease(
    conn: &Connection,
    disease_id: i64,
) -> Result<Vec<TestResult>, DatabaseError> {
    query_test_results(conn, "disease_id", disease_id)
}

pub fn update_test_result_outcome(conn: &Connection, id: i64, result: &str) -> Result<(), DatabaseError> {
    validate_result(result)?;
    let updated = conn.execute(
        "UPDATE test_results SET result = ?1 WHERE id = ?2",
        params![result, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("test_result", id));
    }
    Ok(())
}
