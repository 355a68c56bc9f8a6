use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub customer_id: i64,
    pub test_operator_id: i64,
    pub scheduled_time: NaiveDateTime,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub customer_id: i64,
    pub test_operator_id: i64,
    pub scheduled_time: NaiveDateTime,
    pub status: String,
}

impl NewAppointment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_status(&self.status)
    }
}

/// Status is free text; only presence and length are checked.
pub fn validate_status(status: &str) -> Result<(), ValidationError> {
    validation::required_text("status", status, validation::STATUS_MAX_LENGTH)
}
