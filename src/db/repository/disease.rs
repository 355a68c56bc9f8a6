use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

fn disease_from_row(row: &Row) -> rusqlite::Result<Disease> {
    Ok(Disease {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

pub fn insert_disease(conn: &Connection, disease: &NewDisease) -> Result<Disease, DatabaseError> {
    disease.validate()?;
    conn.execute(
        "INSERT INTO diseases (name, description) VALUES (?1, ?2)",
        params![disease.name, disease.description],
    )?;
    Ok(Disease {
        id: conn.last_insert_rowid(),
        name: disease.name.clone(),
        description: disease.description.clone(),
    })
}

pub fn get_disease(conn: &Connection, id: i64) -> Result<Option<Disease>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT id, name, description FROM diseases WHERE id = ?1",
            params![id],
            disease_from_row,
        )
        .optional()?)
}

pub fn list_diseases(conn: &Connection) -> Result<Vec<Disease>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM diseases ORDER BY name, id")?;
    let rows = stmt.query_map([], disease_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// First catalog entry carrying `name`, if any. Names are not unique.
pub fn find_disease_by_name(conn: &Connection, name: &str) -> Result<Option<Disease>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT id, name, description FROM diseases WHERE name = ?1 ORDER BY id LIMIT 1",
            params![name],
            disease_from_row,
        )
        .optional()?)
}

pub fn update_disease(conn: &Connection, id: i64, disease: &NewDisease) -> Result<(), DatabaseError> {
    disease.validate()?;
    let updated = conn.execute(
        "UPDATE diseases SET name = ?1, description = ?2 WHERE id = ?3",
        params![disease.name, disease.description, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("disease", id));
    }
    Ok(())
}
