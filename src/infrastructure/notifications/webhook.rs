//! Hands reminders to an external delivery worker over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::domain::{DomainError, DomainResult, ReminderMessage, ReminderNotifier};

pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("notification client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReminderNotifier for WebhookNotifier {
    async fn send(&self, message: &ReminderMessage) -> DomainResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| DomainError::Internal(format!("reminder delivery failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Internal(format!(
                "reminder endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        debug!(registration_id = %message.registration_id, "Reminder handed off");
        Ok(())
    }
}
