//! Registration DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::{CancellationResult, CreatedRegistration};
use crate::domain::Registration;

/// Book a child onto an event occurrence
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRegistrationRequest {
    pub child_id: Uuid,
    pub guardian_id: Uuid,
    pub event_occurrence_id: Uuid,
    /// Saved card to authorize against. Required for paid bookings.
    #[validate(length(min = 1, max = 255))]
    pub payment_method_id: Option<String>,
}

/// Move a registration to another child of the same guardian
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRegistrationRequest {
    pub child_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    /// One of `requires_payment_method`, `requires_capture`, `processing`,
    /// `succeeded`, `canceled`
    #[validate(length(min = 1))]
    pub payment_status: String,
}

/// Registration details in API responses. Amounts are in minor currency units.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationDto {
    pub id: Uuid,
    pub child_id: Option<Uuid>,
    pub guardian_id: Option<Uuid>,
    pub event_occurrence_id: Uuid,
    /// `registered` or `cancelled`
    pub status: String,
    pub payment_status: String,
    pub total_amount: i64,
    pub provider_amount: i64,
    pub platform_fee_amount: i64,
    pub currency: String,
    pub payment_intent_id: String,
    pub payment_method_id: Option<String>,
    pub event_name: String,
    pub occurrence_start_time: DateTime<Utc>,
    pub reminder_sent: bool,
    pub refund_status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationDto {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            child_id: r.child_id,
            guardian_id: r.guardian_id,
            event_occurrence_id: r.event_occurrence_id,
            status: r.status.to_string(),
            payment_status: r.payment_status.to_string(),
            total_amount: r.split.total(),
            provider_amount: r.split.provider(),
            platform_fee_amount: r.split.platform_fee(),
            currency: r.currency,
            payment_intent_id: r.authorization_id,
            payment_method_id: r.payment_method_id,
            event_name: r.event_name,
            occurrence_start_time: r.occurrence_start_time,
            reminder_sent: r.reminder_sent,
            refund_status: r.cancellation_outcome.map(|o| o.to_string()),
            paid_at: r.paid_at,
            cancelled_at: r.cancelled_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRegistrationResponse {
    pub registration: RegistrationDto,
    /// Handed to the client when the card needs further confirmation
    pub client_secret: Option<String>,
}

impl From<CreatedRegistration> for CreateRegistrationResponse {
    fn from(created: CreatedRegistration) -> Self {
        Self {
            registration: created.registration.into(),
            client_secret: created.client_secret,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelRegistrationResponse {
    /// `succeeded` (refunded), `cancelled` (voided) or `no_refund_needed`
    pub refund_status: String,
    pub registration: RegistrationDto,
}

impl From<CancellationResult> for CancelRegistrationResponse {
    fn from(result: CancellationResult) -> Self {
        Self {
            refund_status: result.outcome.to_string(),
            registration: result.registration.into(),
        }
    }
}
