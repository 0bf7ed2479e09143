//! Registration repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{CancellationRecord, Registration, ReminderTarget};
use crate::domain::payment::PaymentStatus;
use crate::domain::DomainResult;

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn insert(&self, registration: Registration) -> DomainResult<Registration>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Registration>>;

    /// Newest first.
    async fn find_by_child(&self, child_id: Uuid) -> DomainResult<Vec<Registration>>;

    async fn find_by_guardian(&self, guardian_id: Uuid) -> DomainResult<Vec<Registration>>;

    async fn find_by_occurrence(&self, occurrence_id: Uuid) -> DomainResult<Vec<Registration>>;

    /// Registrations still holding a seat on the occurrence.
    async fn find_active_for_occurrence(
        &self,
        occurrence_id: Uuid,
    ) -> DomainResult<Vec<Registration>>;

    /// Sets `paid_at` on the first transition into `Succeeded`.
    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<Registration>;

    async fn update_child(&self, id: Uuid, child_id: Uuid) -> DomainResult<Registration>;

    /// Mark one registration cancelled and release its seat in the same
    /// transaction. Fails with `AlreadyCancelled` if it no longer holds a seat.
    async fn cancel(&self, record: CancellationRecord) -> DomainResult<Registration>;

    /// Cancel a batch of registrations of one occurrence and release their
    /// seats in a single transaction. Registrations that are no longer
    /// active are skipped.
    async fn cancel_for_occurrence(
        &self,
        occurrence_id: Uuid,
        records: Vec<CancellationRecord>,
    ) -> DomainResult<Vec<Registration>>;

    /// Physically remove a registration, releasing its seat if it held one.
    async fn delete(&self, id: Uuid) -> DomainResult<Registration>;

    /// Active, uncaptured registrations whose occurrence starts in `[from, to]`.
    async fn find_due_for_capture(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Registration>>;

    /// Active registrations without a reminder whose occurrence starts in `[from, to]`.
    async fn find_due_reminders(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<ReminderTarget>>;

    async fn mark_reminder_sent(&self, id: Uuid) -> DomainResult<()>;
}
