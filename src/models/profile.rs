use serde::{Deserialize, Serialize};

use super::enums::EntityKind;
use crate::validation::{self, ValidationError};

/// Role-specific extension of exactly one user account.
///
/// The repository layer uses the table metadata for the lookups every
/// profile shares (by owner, display label, delete).
pub trait Profile {
    const KIND: EntityKind;
    const TABLE: &'static str;

    fn id(&self) -> i64;
    fn user_id(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub user_id: i64,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOperator {
    pub id: i64,
    pub user_id: i64,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernmentOfficial {
    pub id: i64,
    pub user_id: i64,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub user_id: i64,
    pub specialization: String,
}

macro_rules! impl_profile {
    ($ty:ty, $kind:expr, $table:literal) => {
        impl Profile for $ty {
            const KIND: EntityKind = $kind;
            const TABLE: &'static str = $table;

            fn id(&self) -> i64 {
                self.id
            }

            fn user_id(&self) -> i64 {
                self.user_id
            }
        }
    };
}

impl_profile!(Customer, EntityKind::Customer, "customers");
impl_profile!(TestOperator, EntityKind::TestOperator, "test_operators");
impl_profile!(GovernmentOfficial, EntityKind::GovernmentOfficial, "government_officials");
impl_profile!(Doctor, EntityKind::Doctor, "doctors");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerFields {
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerFields {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_phone(self.phone.as_deref())?;
        if let Some(address) = &self.address {
            validation::max_length("address", address, validation::ADDRESS_MAX_LENGTH)?;
        }
        Ok(())
    }
}

pub fn validate_location(location: &str) -> Result<(), ValidationError> {
    validation::required_text("location", location, validation::LABEL_MAX_LENGTH)
}

pub fn validate_region(region: &str) -> Result<(), ValidationError> {
    validation::required_text("region", region, validation::LABEL_MAX_LENGTH)
}

pub fn validate_specialization(specialization: &str) -> Result<(), ValidationError> {
    validation::required_text("specialization", specialization, validation::LABEL_MAX_LENGTH)
}
