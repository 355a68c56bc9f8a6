//! Shared types for the HTTP layer.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::admin::AdminSite;
use crate::api::error::ApiError;
use crate::messaging::MailSettings;
use crate::models::User;
use crate::notification::Mailer;

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Mutex<Connection>>,
    pub admin: Arc<AdminSite>,
    pub mailer: Arc<dyn Mailer>,
    pub mail: Arc<MailSettings>,
}

impl ApiContext {
    pub fn new(
        conn: Connection,
        admin: AdminSite,
        mailer: Arc<dyn Mailer>,
        mail: MailSettings,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            admin: Arc::new(admin),
            mailer,
            mail: Arc::new(mail),
        }
    }

    /// Run one unit of work against the shared connection.
    pub fn with_db<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, ApiError>,
    {
        let conn = self
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
        work(&conn)
    }
}

/// Authenticated staff account, injected by the auth middleware.
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub user: User,
}
