use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub id: i64,
    pub region: String,
    pub total_tests: i64,
    pub positive_results: i64,
    pub date: NaiveDate,
}

impl Statistics {
    /// Counters are not cross-checked on write; this reports the drift.
    pub fn is_consistent(&self) -> bool {
        self.positive_results <= self.total_tests
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStatistics {
    pub region: String,
    pub total_tests: i64,
    pub positive_results: i64,
    pub date: NaiveDate,
}

impl NewStatistics {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required_text("region", &self.region, validation::LABEL_MAX_LENGTH)?;
        validate_counters(self.total_tests, self.positive_results)
    }
}

pub fn validate_counters(total_tests: i64, positive_results: i64) -> Result<(), ValidationError> {
    validation::non_negative("total_tests", total_tests)?;
    validation::non_negative("positive_results", positive_results)
}
