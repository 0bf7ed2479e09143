use async_trait::async_trait;
use tracing::info;

use crate::domain::{DomainResult, ReminderMessage, ReminderNotifier};

/// Writes reminders to the structured log. Used when no delivery endpoint
/// is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl ReminderNotifier for LogNotifier {
    async fn send(&self, message: &ReminderMessage) -> DomainResult<()> {
        info!(
            registration_id = %message.registration_id,
            recipient = message.recipient_email.as_deref().unwrap_or("-"),
            subject = %message.subject,
            body = %message.body,
            "📨 Reminder"
        );
        Ok(())
    }
}
