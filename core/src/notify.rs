//! Notification collaborator interface.
//!
//! The confirmation email/QR pipeline is an external sink consuming a
//! finalized reservation record. It is invoked only after a successful
//! commit, and its failures never roll a booking back.

use crate::types::{BookedSlotSummary, ContactId};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Notification failures; transient, retried outside the booking path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// The sink was unreachable or refused the message.
    #[error("transient notification failure: {0}")]
    Transient(String),
}

/// External confirmation sink.
#[async_trait]
pub trait ConfirmationSender: Send + Sync {
    /// Sends a booking confirmation for the given slots.
    ///
    /// # Errors
    ///
    /// `NotifyError::Transient` when delivery failed; the caller logs and
    /// moves on, never unwinding the reservation.
    async fn send_confirmation(
        &self,
        contact_id: &ContactId,
        language: &str,
        slots: &[BookedSlotSummary],
    ) -> Result<(), NotifyError>;
}

/// Recording sink double for tests.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(ContactId, String, Vec<BookedSlotSummary>)>>,
}

impl RecordingSender {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmations delivered so far.
    pub async fn deliveries(&self) -> Vec<(ContactId, String, Vec<BookedSlotSummary>)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ConfirmationSender for RecordingSender {
    async fn send_confirmation(
        &self,
        contact_id: &ContactId,
        language: &str,
        slots: &[BookedSlotSummary],
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .await
            .push((contact_id.clone(), language.to_string(), slots.to_vec()));
        Ok(())
    }
}

/// Sink double that always fails, for decoupling tests.
#[derive(Default)]
pub struct FailingSender;

#[async_trait]
impl ConfirmationSender for FailingSender {
    async fn send_confirmation(
        &self,
        _contact_id: &ContactId,
        _language: &str,
        _slots: &[BookedSlotSummary],
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Transient("sink offline".to_string()))
    }
}
