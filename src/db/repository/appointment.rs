use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ensure_exists, format_datetime, parse_datetime};
use crate::db::{is_foreign_key_violation, DatabaseError};
use crate::models::enums::EntityKind;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, customer_id, test_operator_id, scheduled_time, status";

fn appointment_from_row(row: &Row) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        test_operator_id: row.get(2)?,
        scheduled_time: parse_datetime(3, &row.get::<_, String>(3)?)?,
        status: row.get(4)?,
    })
}

/// Book an appointment. Overlapping bookings for the same operator are allowed.
pub fn insert_appointment(conn: &Connection, appt: &NewAppointment) -> Result<Appointment, DatabaseError> {
    appt.validate()?;
    ensure_exists(conn, EntityKind::Customer, appt.customer_id)?;
    ensure_exists(conn, EntityKind::TestOperator, appt.test_operator_id)?;

    conn.execute(
        "INSERT INTO appointments (customer_id, test_operator_id, scheduled_time, status)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            appt.customer_id,
            appt.test_operator_id,
            format_datetime(&appt.scheduled_time),
            appt.status,
        ],
    )
    .map_err(|e| reference_error(conn, appt, e))?;

    Ok(Appointment {
        id: conn.last_insert_rowid(),
        customer_id: appt.customer_id,
        test_operator_id: appt.test_operator_id,
        scheduled_time: appt.scheduled_time,
        status: appt.status.clone(),
    })
}

/// Name the parent that vanished when the insert trips a foreign key.
fn reference_error(conn: &Connection, appt: &NewAppointment, err: rusqlite::Error) -> DatabaseError {
    if !is_foreign_key_violation(&err) {
        return err.into();
    }
    let parents = [
        (EntityKind::Customer, appt.customer_id),
        (EntityKind::TestOperator, appt.test_operator_id),
    ];
    for (kind, id) in parents {
        if let Err(missing) = ensure_exists(conn, kind, id) {
            return missing;
        }
    }
    err.into()
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], appointment_from_row).optional()?)
}

fn query_appointments(conn: &Connection, column: &str, value: i64) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE {column} = ?1
         ORDER BY scheduled_time, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![value], appointment_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// A customer's bookings, earliest first.
pub fn list_appointments_for_customer(
    conn: &Connection,
    customer_id: i64,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(conn, "customer_id", customer_id)
}

/// Bookings operated by a test operator, earliest first.
pub fn list_appointments_for_operator(
    conn: &Connection,
    test_operator_id: i64,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_appointments(conn, "test_operator_id", test_operator_id)
}

pub fn update_appointment_status(conn: &Connection, id: i64, status: &str) -> Result<(), DatabaseError> {
    validate_status(status)?;
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("appointment", id));
    }
    Ok(())
}

pub fn reschedule_appointment(
    conn: &Connection,
    id: i64,
    scheduled_time: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET scheduled_time = ?1 WHERE id = ?2",
        params![format_datetime(scheduled_time), id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("appointment", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{count_rows, delete_entity};
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::validation::ValidationError;

    #[test]
    fn booking_is_visible_from_both_sides() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "a@x.com");
        let operator = make_operator(&conn, "b@x.com", "City");

        let appt = insert_appointment(&conn, &NewAppointment {
            customer_id: customer.id,
            test_operator_id: operator.id,
            scheduled_time: at("2024-05-01 09:30:00"),
            status: "scheduled".into(),
        })
        .unwrap();

        let by_customer = list_appointments_for_customer(&conn, customer.id).unwrap();
        let by_operator = list_appointments_for_operator(&conn, operator.id).unwrap();
        assert_eq!(by_customer.len(), 1);
        assert_eq!(by_operator.len(), 1);
        assert_eq!(by_customer[0], appt);
        assert_eq!(by_operator[0], appt);
        assert_eq!(get_appointment(&conn, appt.id).unwrap(), Some(appt));
    }

    #[test]
    fn missing_customer_is_missing_reference() {
        let conn = open_memory_database().unwrap();
        let operator = make_operator(&conn, "b@x.com", "City");
        let err = insert_appointment(&conn, &NewAppointment {
            customer_id: 404,
            test_operator_id: operator.id,
            scheduled_time: at("2024-05-01 09:30:00"),
            status: "scheduled".into(),
        })
        .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::MissingReference { ref entity_type, id: 404 } if entity_type == "customer"
        ));
        assert_eq!(count_rows(&conn, EntityKind::Appointment).unwrap(), 0);
    }

    #[test]
    fn missing_operator_is_missing_reference() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "a@x.com");
        let err = insert_appointment(&conn, &NewAppointment {
            customer_id: customer.id,
            test_operator_id: 12,
            scheduled_time: at("2024-05-01 09:30:00"),
            status: "scheduled".into(),
        })
        .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::MissingReference { ref entity_type, id: 12 } if entity_type == "test_operator"
        ));
    }

    #[test]
    fn foreign_key_failure_names_the_absent_operator() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "a@x.com");
        let appt = NewAppointment {
            customer_id: customer.id,
            test_operator_id: 77,
            scheduled_time: at("2024-05-01 09:30:00"),
            status: "scheduled".into(),
        };
        // Skip the pre-checks so the constraint itself fires.
        let raw = conn
            .execute(
                "INSERT INTO appointments (customer_id, test_operator_id, scheduled_time, status)
                 VALUES (?1, ?2, ?3, ?4)",
                params![appt.customer_id, appt.test_operator_id, "2024-05-01 09:30:00", appt.status],
            )
            .unwrap_err();
        assert!(matches!(
            reference_error(&conn, &appt, raw),
            DatabaseError::MissingReference { ref entity_type, id: 77 } if entity_type == "test_operator"
        ));
    }

    #[test]
    fn double_booking_the_same_slot_is_allowed() {
        let conn = open_memory_database().unwrap();
        let first = make_customer(&conn, "a@x.com");
        let second = make_customer(&conn, "c@x.com");
        let operator = make_operator(&conn, "b@x.com", "City");
        make_appointment(&conn, &first, &operator, "2024-05-01 09:30:00");
        make_appointment(&conn, &second, &operator, "2024-05-01 09:30:00");
        assert_eq!(list_appointments_for_operator(&conn, operator.id).unwrap().len(), 2);
    }

    #[test]
    fn status_is_free_text_but_not_blank() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "a@x.com");
        let operator = make_operator(&conn, "b@x.com", "City");
        let appt = make_appointment(&conn, &customer, &operator, "2024-05-01 09:30:00");

        update_appointment_status(&conn, appt.id, "sample lost, rebook").unwrap();
        assert_eq!(
            get_appointment(&conn, appt.id).unwrap().unwrap().status,
            "sample lost, rebook"
        );
        assert!(matches!(
            update_appointment_status(&conn, appt.id, ""),
            Err(DatabaseError::Validation(ValidationError::Required("status")))
        ));
    }

    #[test]
    fn reschedule_changes_ordering() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "a@x.com");
        let operator = make_operator(&conn, "b@x.com", "City");
        let early = make_appointment(&conn, &customer, &operator, "2024-05-01 09:30:00");
        let late = make_appointment(&conn, &customer, &operator, "2024-05-03 09:30:00");

        reschedule_appointment(&conn, early.id, &at("2024-05-10 14:00:00")).unwrap();
        let ids: Vec<i64> = list_appointments_for_customer(&conn, customer.id)
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![late.id, early.id]);
    }

    #[test]
    fn deleting_appointment_leaves_parents() {
        let conn = open_memory_database().unwrap();
        let customer = make_customer(&conn, "a@x.com");
        let operator = make_operator(&conn, "b@x.com", "City");
        let appt = make_appointment(&conn, &customer, &operator, "2024-05-01 09:30:00");

        delete_entity(&conn, EntityKind::Appointment, appt.id).unwrap();
        assert!(get_appointment(&conn, appt.id).unwrap().is_none());
        assert_eq!(count_rows(&conn, EntityKind::Customer).unwrap(), 1);
        assert_eq!(count_rows(&conn, EntityKind::TestOperator).unwrap(), 1);
    }
}
