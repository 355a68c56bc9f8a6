//! Outbound mail boundary.
//!
//! Delivery (SMTP, retries, bounces) belongs to whoever implements
//! [`Mailer`]. The two backends here cover development and tests.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::enums::MailBackend;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail collaborator unreachable: {0}")]
    Unreachable(String),

    #[error("Mail rejected: {0}")]
    Rejected(String),

    #[error("Mail outbox lock poisoned")]
    LockPoisoned,
}

pub trait Mailer: Send + Sync {
    /// Hand one message to the collaborator. Errors must be reported, not swallowed.
    fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Writes each message to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            "{}",
            message.body
        );
        Ok(())
    }
}

/// Keeps sent messages in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<MailMessage>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbox(&self) -> Result<Vec<MailMessage>, MailError> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .map_err(|_| MailError::LockPoisoned)
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.outbox
            .lock()
            .map_err(|_| MailError::LockPoisoned)?
            .push(message.clone());
        Ok(())
    }
}

pub fn build_mailer(backend: MailBackend) -> Arc<dyn Mailer> {
    match backend {
        MailBackend::Console => Arc::new(ConsoleMailer),
        MailBackend::Memory => Arc::new(MemoryMailer::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> MailMessage {
        MailMessage {
            from: "noreply@pestwatch.local".into(),
            to: vec!["a@x.com".into()],
            subject: "Hello".into(),
            body: "Body".into(),
        }
    }

    #[test]
    fn memory_mailer_records_messages_in_order() {
        let mailer = MemoryMailer::new();
        mailer.send(&message()).unwrap();
        let mut second = message();
        second.subject = "Second".into();
        mailer.send(&second).unwrap();

        let outbox = mailer.outbox().unwrap();
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[1].subject, "Second");
    }

    #[test]
    fn memory_mailer_clones_share_outbox() {
        let mailer = MemoryMailer::new();
        let handle = mailer.clone();
        mailer.send(&message()).unwrap();
        assert_eq!(handle.outbox().unwrap().len(), 1);
    }

    #[test]
    fn console_mailer_accepts_messages() {
        assert!(ConsoleMailer.send(&message()).is_ok());
    }
}
