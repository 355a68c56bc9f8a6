use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Disease {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDisease {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl NewDisease {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::max_length("name", name, validation::LABEL_MAX_LENGTH)?;
        }
        Ok(())
    }
}
