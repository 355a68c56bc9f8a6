//! Administrative surface: read-only changelists and change views built
//! from a descriptor registry.
//!
//! `AdminSite::configure` is the only way to obtain a site; it checks every
//! descriptor against the column catalog so that a bad field name fails at
//! startup instead of on the first request.

pub mod catalog;
pub mod descriptors;
pub mod query;

pub use descriptors::*;
pub use query::*;

use std::str::FromStr;

use rusqlite::Connection;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::enums::EntityKind;

/// Where unauthenticated staff are sent.
pub const ACCOUNT_LOGIN_URL: &str = "/accounts/login/";

/// Rows per changelist page.
pub const LIST_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginWorkflow {
    /// Challenge for admin credentials directly.
    #[default]
    AdminCredentials,
    /// Redirect to the account login page.
    Accounts,
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Unknown admin entity: {0}")]
    UnknownEntity(String),

    #[error("{0} is not registered with the admin site")]
    NotRegistered(EntityKind),

    #[error("{0} is registered twice")]
    AlreadyRegistered(EntityKind),

    #[error("{entity} has no field {field}")]
    UnknownField { entity: EntityKind, field: String },

    #[error("{entity} cannot be filtered by {filter}")]
    UnknownFilter { entity: EntityKind, filter: String },

    #[error("Invalid value for filter {filter}: {value}")]
    InvalidFilterValue { filter: String, value: String },

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for AdminError {
    fn from(err: rusqlite::Error) -> Self {
        AdminError::Database(err.into())
    }
}

#[derive(Debug, Clone)]
pub struct AdminSite {
    login: LoginWorkflow,
    registry: Vec<ViewDescriptor>,
}

impl AdminSite {
    /// Build the site with the default registry.
    pub fn configure(login: LoginWorkflow) -> Result<Self, AdminError> {
        Self::with_descriptors(login, default_descriptors())
    }

    pub fn with_descriptors(
        login: LoginWorkflow,
        descriptors: Vec<ViewDescriptor>,
    ) -> Result<Self, AdminError> {
        let mut registry: Vec<ViewDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if registry.iter().any(|d| d.entity == descriptor.entity) {
                return Err(AdminError::AlreadyRegistered(descriptor.entity));
            }
            check_descriptor(&descriptor)?;
            registry.push(descriptor);
        }
        tracing::info!(entities = registry.len(), ?login, "Admin site configured");
        Ok(Self { login, registry })
    }

    pub fn login(&self) -> LoginWorkflow {
        self.login
    }

    /// Registered entities, in registration order.
    pub fn entities(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.registry.iter().map(|d| d.entity)
    }

    pub fn descriptor(&self, entity: EntityKind) -> Result<&ViewDescriptor, AdminError> {
        self.registry
            .iter()
            .find(|d| d.entity == entity)
            .ok_or(AdminError::NotRegistered(entity))
    }

    /// Resolve a URL segment such as `test_operator` to a registered entity.
    pub fn resolve(&self, segment: &str) -> Result<EntityKind, AdminError> {
        let entity = EntityKind::from_str(segment)
            .map_err(|_| AdminError::UnknownEntity(segment.to_string()))?;
        self.descriptor(entity)?;
        Ok(entity)
    }

    pub fn changelist(
        &self,
        conn: &Connection,
        entity: EntityKind,
        query: &ChangeListQuery,
    ) -> Result<ChangeList, AdminError> {
        query::changelist(conn, self.descriptor(entity)?, query)
    }

    pub fn change_view(
        &self,
        conn: &Connection,
        entity: EntityKind,
        id: i64,
    ) -> Result<ChangeView, AdminError> {
        query::change_view(conn, self.descriptor(entity)?, id)
    }
}

fn check_descriptor(descriptor: &ViewDescriptor) -> Result<(), AdminError> {
    let spec = catalog::table_spec(descriptor.entity);
    for field in descriptor.referenced_fields() {
        if spec.column(field).is_none() {
            return Err(AdminError::UnknownField {
                entity: descriptor.entity,
                field: field.to_string(),
            });
        }
    }

    for inline in &descriptor.inlines {
        let child = catalog::table_spec(inline.child);
        for field in inline.fields.iter().chain(std::iter::once(&inline.parent_key)) {
            if child.column(field).is_none() {
                return Err(AdminError::UnknownField {
                    entity: inline.child,
                    field: field.to_string(),
                });
            }
        }
    }
    Ok(())
}
