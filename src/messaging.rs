//! Communication dispatch: emails a recorded communication to its customer.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;
use crate::db::{self, DatabaseError};
use crate::models::{Communication, NewCommunication};
use crate::notification::{MailError, MailMessage, Mailer};

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Failed to dispatch communication {communication_id}: {source}")]
    Dispatch {
        communication_id: i64,
        #[source]
        source: MailError,
    },
}

/// Fixed envelope fields for communication emails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSettings {
    pub from: String,
    pub subject: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from: config::DEFAULT_MAIL_FROM.into(),
            subject: config::COMMUNICATION_SUBJECT.into(),
        }
    }
}

/// Build the email for a communication: one recipient, the customer's account email.
pub fn compose(
    conn: &Connection,
    settings: &MailSettings,
    communication: &Communication,
) -> Result<MailMessage, DatabaseError> {
    let recipient = db::customer_email(conn, communication.customer_id)?;
    Ok(MailMessage {
        from: settings.from.clone(),
        to: vec![recipient],
        subject: settings.subject.clone(),
        body: communication.message_content.clone(),
    })
}

/// Email a communication to its customer and return what was sent.
///
/// A mailer failure is returned as `MessagingError::Dispatch`; nothing is
/// retried and nothing is ignored.
pub fn send_message(
    conn: &Connection,
    mailer: &dyn Mailer,
    settings: &MailSettings,
    communication: &Communication,
) -> Result<MailMessage, MessagingError> {
    let message = compose(conn, settings, communication)?;
    mailer.send(&message).map_err(|source| {
        tracing::error!(communication_id = communication.id, "Communication dispatch failed: {source}");
        MessagingError::Dispatch {
            communication_id: communication.id,
            source,
        }
    })?;
    tracing::info!(communication_id = communication.id, "Communication dispatched");
    Ok(message)
}

/// Record a communication, then email it.
///
/// The row is kept when dispatch fails; the error still reaches the caller.
pub fn record_and_send(
    conn: &Connection,
    mailer: &dyn Mailer,
    settings: &MailSettings,
    new: &NewCommunication,
) -> Result<Communication, MessagingError> {
    let communication = db::insert_communication(conn, new)?;
    send_message(conn, mailer, settings, &communication)?;
    Ok(communication)
}
