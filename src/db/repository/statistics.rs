use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_date, DATE_FORMAT};
use crate::db::DatabaseError;
use crate::models::*;

const STATISTICS_COLUMNS: &str = "id, region, total_tests, positive_results, date";

fn statistics_from_row(row: &Row) -> rusqlite::Result<Statistics> {
    Ok(Statistics {
        id: row.get(0)?,
        region: row.get(1)?,
        total_tests: row.get(2)?,
        positive_results: row.get(3)?,
        date: parse_date(4, &row.get::<_, String>(4)?)?,
    })
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn insert_statistics(conn: &Connection, stats: &NewStatistics) -> Result<Statistics, DatabaseError> {
    stats.validate()?;
    if stats.positive_results > stats.total_tests {
        tracing::warn!(
            region = %stats.region,
            total = stats.total_tests,
            positive = stats.positive_results,
            "Statistics row has more positives than tests"
        );
    }

    conn.execute(
        "INSERT INTO statistics (region, total_tests, positive_results, date)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            stats.region,
            stats.total_tests,
            stats.positive_results,
            format_date(&stats.date),
        ],
    )?;

    Ok(Statistics {
        id: conn.last_insert_rowid(),
        region: stats.region.clone(),
        total_tests: stats.total_tests,
        positive_results: stats.positive_results,
        date: stats.date,
    })
}

pub fn get_statistics(conn: &Connection, id: i64) -> Result<Option<Statistics>, DatabaseError> {
    let sql = format!("SELECT {STATISTICS_COLUMNS} FROM statistics WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], statistics_from_row).optional()?)
}

/// Rows for one region, newest date first.
pub fn list_statistics_for_region(conn: &Connection, region: &str) -> Result<Vec<Statistics>, DatabaseError> {
    let sql = format!(
        "SELECT {STATISTICS_COLUMNS} FROM statistics WHERE region = ?1 ORDER BY date DESC, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![region], statistics_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Rows dated within `[from, to]`, oldest first.
pub fn list_statistics_between(
    conn: &Connection,
    from: &NaiveDate,
    to: &NaiveDate,
) -> Result<Vec<Statistics>, DatabaseError> {
    let sql = format!(
        "SELECT {STATISTICS_COLUMNS} FROM statistics WHERE date BETWEEN ?1 AND ?2
         ORDER BY date, region, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![format_date(from), format_date(to)], statistics_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_statistics_counters(
    conn: &Connection,
    id: i64,
    total_tests: i64,
    positive_results: i64,
) -> Result<(), DatabaseError> {
    validate_counters(total_tests, positive_results)?;
    let updated = conn.execute(
        "UPDATE statistics SET total_tests = ?1, positive_results = ?2 WHERE id = ?3",
        params![total_tests, positive_results, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("statistics", id));
    }
    Ok(())
}

/// Rows whose positive count exceeds the number of tests.
///
/// The bound is not enforced on write; this is a read-only audit.
pub fn find_inconsistent_statistics(conn: &Connection) -> Result<Vec<Statistics>, DatabaseError> {
    let sql = format!(
        "SELECT {STATISTICS_COLUMNS} FROM statistics WHERE positive_results > total_tests
         ORDER BY date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], statistics_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
