//! Occurrence repository trait
//!
//! Seat counts only change through `try_admit` and `release`, which are
//! single conditional updates in every implementation.

use async_trait::async_trait;
use uuid::Uuid;

use super::model::EventOccurrence;
use crate::domain::DomainResult;

#[async_trait]
pub trait OccurrenceRepository: Send + Sync {
    async fn insert(&self, occurrence: EventOccurrence) -> DomainResult<EventOccurrence>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<EventOccurrence>>;

    /// Take one seat if the occurrence is scheduled and not full.
    /// Returns `false` when nothing was updated.
    async fn try_admit(&self, id: Uuid) -> DomainResult<bool>;

    /// Give back one seat, never going below zero.
    async fn release(&self, id: Uuid) -> DomainResult<bool>;

    /// Flip a scheduled occurrence to cancelled. Returns `false` if it was
    /// not scheduled.
    async fn mark_cancelled(&self, id: Uuid) -> DomainResult<bool>;
}
