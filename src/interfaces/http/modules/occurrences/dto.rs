//! Event occurrence DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::OccurrenceCancellation;
use crate::domain::CapacitySnapshot;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CapacityDto {
    pub occurrence_id: Uuid,
    pub max_attendees: i32,
    pub curr_enrolled: i32,
    pub remaining: i32,
    /// `scheduled` or `cancelled`
    pub status: String,
}

impl From<CapacitySnapshot> for CapacityDto {
    fn from(c: CapacitySnapshot) -> Self {
        Self {
            occurrence_id: c.occurrence_id,
            max_attendees: c.max_attendees,
            curr_enrolled: c.curr_enrolled,
            remaining: c.remaining,
            status: c.status.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelledRegistrationDto {
    pub registration_id: Uuid,
    pub refund_status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FailedCancellationDto {
    pub registration_id: Uuid,
    pub error: String,
}

/// Outcome of cancelling an occurrence. When `complete` is false, calling
/// cancel again retries only the registrations listed in `failed`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OccurrenceCancellationDto {
    pub occurrence_id: Uuid,
    pub complete: bool,
    pub cancelled: Vec<CancelledRegistrationDto>,
    pub failed: Vec<FailedCancellationDto>,
}

impl From<OccurrenceCancellation> for OccurrenceCancellationDto {
    fn from(c: OccurrenceCancellation) -> Self {
        Self {
            occurrence_id: c.occurrence_id,
            complete: c.is_complete(),
            cancelled: c
                .cancelled
                .into_iter()
                .map(|(registration_id, outcome)| CancelledRegistrationDto {
                    registration_id,
                    refund_status: outcome.to_string(),
                })
                .collect(),
            failed: c
                .failed
                .into_iter()
                .map(|(registration_id, error)| FailedCancellationDto {
                    registration_id,
                    error,
                })
                .collect(),
        }
    }
}
