use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError};

/// A recorded test outcome. `disease_tested` is read from the linked
/// disease's name and is never stored separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: i64,
    pub appointment_id: i64,
    pub result: String,
    pub disease_id: i64,
    pub disease_tested: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTestResult {
    pub appointment_id: i64,
    pub result: String,
    pub disease_id: i64,
}

impl NewTestResult {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_result(&self.result)
    }
}

pub fn validate_result(result: &str) -> Result<(), ValidationError> {
    validation::required_text("result", result, validation::RESULT_MAX_LENGTH)
}
