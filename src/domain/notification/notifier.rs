use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::registration::ReminderTarget;
use crate::domain::DomainResult;

/// A reminder ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderMessage {
    pub registration_id: Uuid,
    pub guardian_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_email: Option<String>,
    pub subject: String,
    pub body: String,
    pub event_name: String,
    pub occurrence_start_time: DateTime<Utc>,
}

impl ReminderMessage {
    pub fn for_target(target: &ReminderTarget) -> Self {
        let name = target
            .guardian_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Guardian")
            .to_string();
        let body = format!(
            "Hi {}, Reminder: {} is coming up at {}!",
            name,
            target.event_name,
            target.occurrence_start_time.format("%Y-%m-%d %H:%M UTC"),
        );
        Self {
            registration_id: target.registration_id,
            guardian_id: target.guardian_id,
            recipient_name: name,
            recipient_email: target.guardian_email.clone(),
            subject: "Event Reminder".to_string(),
            body,
            event_name: target.event_name.clone(),
            occurrence_start_time: target.occurrence_start_time,
        }
    }
}

/// Delivery channel for reminders. Success means the message was handed off.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn send(&self, message: &ReminderMessage) -> DomainResult<()>;
}
