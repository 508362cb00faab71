//! Confirmation sink implementations.
//!
//! The real email/QR pipeline sits behind a webhook endpoint; without one
//! configured, confirmations are logged and dropped (rehearsal mode).

use crate::config::NotifyConfig;
use async_trait::async_trait;
use openday_core::notify::{ConfirmationSender, NotifyError};
use openday_core::{BookedSlotSummary, ContactId};
use serde::Serialize;
use std::time::Duration;

/// Webhook-backed confirmation sender.
pub struct HttpConfirmationSender {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ConfirmationPayload<'a> {
    contact_id: &'a ContactId,
    language: &'a str,
    slots: &'a [BookedSlotSummary],
}

impl HttpConfirmationSender {
    /// Builds a sender posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// `NotifyError::Transient` when the HTTP client cannot be constructed.
    pub fn new(endpoint: String, config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| NotifyError::Transient(e.to_string()))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl ConfirmationSender for HttpConfirmationSender {
    async fn send_confirmation(
        &self,
        contact_id: &ContactId,
        language: &str,
        slots: &[BookedSlotSummary],
    ) -> Result<(), NotifyError> {
        self.client
            .post(&self.endpoint)
            .json(&ConfirmationPayload {
                contact_id,
                language,
                slots,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Transient(e.to_string()))?
            .error_for_status()
            .map_err(|e| NotifyError::Transient(e.to_string()))?;
        Ok(())
    }
}

/// Log-only sender used when no endpoint is configured.
#[derive(Default)]
pub struct LogOnlySender;

#[async_trait]
impl ConfirmationSender for LogOnlySender {
    async fn send_confirmation(
        &self,
        contact_id: &ContactId,
        language: &str,
        slots: &[BookedSlotSummary],
    ) -> Result<(), NotifyError> {
        tracing::info!(
            contact = %contact_id,
            language,
            slots = slots.len(),
            "confirmation (log-only delivery)"
        );
        Ok(())
    }
}
