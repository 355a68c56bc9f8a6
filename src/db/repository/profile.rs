use rusqlite::{params, Connection, OptionalExtension, Row};

use super::ensure_exists;
use crate::db::{is_unique_violation, DatabaseError};
use crate::models::enums::EntityKind;
use crate::models::*;

fn profile_insert_error<P: Profile>(err: rusqlite::Error, user_id: i64) -> DatabaseError {
    if is_unique_violation(&err) {
        DatabaseError::UniqueViolation {
            entity_type: P::KIND.as_str().into(),
            field: "user".into(),
            value: user_id.to_string(),
        }
    } else {
        err.into()
    }
}

/// Human-readable label of a profile: its owner's email.
pub fn profile_label<P: Profile>(conn: &Connection, profile: &P) -> Result<String, DatabaseError> {
    conn.query_row(
        "SELECT email FROM users WHERE id = ?1",
        params![profile.user_id()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("user", profile.user_id()))
}

// ─── Customers ────────────────────────────────────────────────────────────────

fn customer_from_row(row: &Row) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        phone: row.get(2)?,
        address: row.get(3)?,
    })
}

pub fn insert_customer(
    conn: &Connection,
    user_id: i64,
    fields: &CustomerFields,
) -> Result<Customer, DatabaseError> {
    fields.validate()?;
    ensure_exists(conn, EntityKind::User, user_id)?;
    conn.execute(
        "INSERT INTO customers (user_id, phone, address) VALUES (?1, ?2, ?3)",
        params![user_id, fields.phone, fields.address],
    )
    .map_err(|e| profile_insert_error::<Customer>(e, user_id))?;

    Ok(Customer {
        id: conn.last_insert_rowid(),
        user_id,
        phone: fields.phone.clone(),
        address: fields.address.clone(),
    })
}

pub fn get_customer(conn: &Connection, id: i64) -> Result<Option<Customer>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT id, user_id, phone, address FROM customers WHERE id = ?1",
            params![id],
            customer_from_row,
        )
        .optional()?)
}

pub fn get_customer_for_user(conn: &Connection, user_id: i64) -> Result<Option<Customer>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT id, user_id, phone, address FROM customers WHERE user_id = ?1",
            params![user_id],
            customer_from_row,
        )
        .optional()?)
}

pub fn list_customers(conn: &Connection) -> Result<Vec<Customer>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, user_id, phone, address FROM customers ORDER BY id")?;
    let rows = stmt.query_map([], customer_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_customer(conn: &Connection, id: i64, fields: &CustomerFields) -> Result<(), DatabaseError> {
    fields.validate()?;
    let updated = conn.execute(
        "UPDATE customers SET phone = ?1, address = ?2 WHERE id = ?3",
        params![fields.phone, fields.address, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("customer", id));
    }
    Ok(())
}

/// Email address of the customer's owning account.
pub fn customer_email(conn: &Connection, customer_id: i64) -> Result<String, DatabaseError> {
    conn.query_row(
        "SELECT u.email FROM customers c JOIN users u ON u.id = c.user_id WHERE c.id = ?1",
        params![customer_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("customer", customer_id))
}

// ─── Single-field role profiles ───────────────────────────────────────────────
//
// Test operators, government officials and doctors share one shape: an owner
// plus one required text column.

fn insert_role_profile<P: Profile>(
    conn: &Connection,
    column: &str,
    user_id: i64,
    value: &str,
) -> Result<i64, DatabaseError> {
    ensure_exists(conn, EntityKind::User, user_id)?;
    let sql = format!("INSERT INTO {} (user_id, {column}) VALUES (?1, ?2)", P::TABLE);
    conn.execute(&sql, params![user_id, value])
        .map_err(|e| profile_insert_error::<P>(e, user_id))?;
    Ok(conn.last_insert_rowid())
}

fn update_role_profile<P: Profile>(
    conn: &Connection,
    column: &str,
    id: i64,
    value: &str,
) -> Result<(), DatabaseError> {
    let sql = format!("UPDATE {} SET {column} = ?1 WHERE id = ?2", P::TABLE);
    let updated = conn.execute(&sql, params![value, id])?;
    if updated == 0 {
        return Err(DatabaseError::not_found(P::KIND.as_str(), id));
    }
    Ok(())
}

fn query_role_profiles<P: Profile>(
    conn: &Connection,
    column: &str,
    filter: &str,
    param: Option<i64>,
    build: fn(i64, i64, String) -> P,
) -> Result<Vec<P>, DatabaseError> {
    let sql = format!(
        "SELECT id, user_id, {column} FROM {} {filter} ORDER BY id",
        P::TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let map = |row: &Row| -> rusqlite::Result<P> {
        Ok(build(row.get(0)?, row.get(1)?, row.get(2)?))
    };
    let rows = match param {
        Some(value) => stmt.query_map(params![value], map)?,
        None => stmt.query_map([], map)?,
    };
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

macro_rules! role_profile_repository {
    (
        $ty:ident, $column:ident, $validate:path,
        insert: $insert:ident, get: $get:ident, for_user: $for_user:ident,
        list: $list:ident, update: $update:ident
    ) => {
        pub fn $insert(conn: &Connection, user_id: i64, $column: &str) -> Result<$ty, DatabaseError> {
            $validate($column)?;
            let id = insert_role_profile::<$ty>(conn, stringify!($column), user_id, $column)?;
            Ok($ty { id, user_id, $column: $column.to_string() })
        }

        pub fn $get(conn: &Connection, id: i64) -> Result<Option<$ty>, DatabaseError> {
            let mut found = query_role_profiles::<$ty>(
                conn,
                stringify!($column),
                "WHERE id = ?1",
                Some(id),
                |id, user_id, $column| $ty { id, user_id, $column },
            )?;
            Ok(found.pop())
        }

        pub fn $for_user(conn: &Connection, user_id: i64) -> Result<Option<$ty>, DatabaseError> {
            let mut found = query_role_profiles::<$ty>(
                conn,
                stringify!($column),
                "WHERE user_id = ?1",
                Some(user_id),
                |id, user_id, $column| $ty { id, user_id, $column },
            )?;
            Ok(found.pop())
        }

        pub fn $list(conn: &Connection) -> Result<Vec<$ty>, DatabaseError> {
            query_role_profiles::<$ty>(
                conn,
                stringify!($column),
                "",
                None,
                |id, user_id, $column| $ty { id, user_id, $column },
            )
        }

        pub fn $update(conn: &Connection, id: i64, $column: &str) -> Result<(), DatabaseError> {
            $validate($column)?;
            update_role_profile::<$ty>(conn, stringify!($column), id, $column)
        }
    };
}

role_profile_repository!(
    TestOperator, location, validate_location,
    insert: insert_test_operator, get: get_test_operator, for_user: get_test_operator_for_user,
    list: list_test_operators, update: update_test_operator_location
);

role_profile_repository!(
    GovernmentOfficial, region, validate_region,
    insert: insert_government_official, get: get_government_official,
    for_user: get_government_official_for_user,
    list: list_government_officials, update: update_government_official_region
);

role_profile_repository!(
    Doctor, specialization, validate_specialization,
    insert: insert_doctor, get: get_doctor, for_user: get_doctor_for_user,
    list: list_doctors, update: update_doctor_specialization
);
