use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub id: i64,
    pub customer_id: i64,
    pub government_official_id: i64,
    pub message_content: String,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommunication {
    pub customer_id: i64,
    pub government_official_id: i64,
    pub message_content: String,
    pub timestamp: NaiveDateTime,
}

impl NewCommunication {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require("message_content", &self.message_content)
    }
}
