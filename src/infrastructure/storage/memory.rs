//! In-memory storage implementation
//!
//! Backs development mode and the service tests. Seat updates happen while
//! holding the occurrence's map entry, which makes check-and-increment
//! atomic per occurrence. When a registration and its occurrence are both
//! touched the registration entry is always locked first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{
    CancellationRecord, Child, DirectoryRepository, DomainError, DomainResult, EventOccurrence,
    Guardian, OccurrenceRepository, OccurrenceStatus, Organization, PaymentStatus, Registration,
    RegistrationRepository, ReminderTarget, RepositoryProvider,
};

/// In-memory storage for development and testing
#[derive(Default)]
pub struct InMemoryStorage {
    registrations: DashMap<Uuid, Registration>,
    occurrences: DashMap<Uuid, EventOccurrence>,
    children: DashMap<Uuid, Child>,
    guardians: DashMap<Uuid, Guardian>,
    organizations: DashMap<Uuid, Organization>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&self, child: Child) {
        self.children.insert(child.id, child);
    }

    pub fn add_guardian(&self, guardian: Guardian) {
        self.guardians.insert(guardian.id, guardian);
    }

    pub fn add_organization(&self, organization: Organization) {
        self.organizations.insert(organization.id, organization);
    }

    fn release_seat(&self, occurrence_id: Uuid) -> bool {
        match self.occurrences.get_mut(&occurrence_id) {
            Some(mut occurrence) if occurrence.curr_enrolled > 0 => {
                occurrence.curr_enrolled -= 1;
                occurrence.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    fn sorted_newest_first(mut items: Vec<Registration>) -> Vec<Registration> {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    fn occurrence_cancelled(&self, occurrence_id: Uuid) -> bool {
        self.occurrences
            .get(&occurrence_id)
            .is_some_and(|o| o.status == OccurrenceStatus::Cancelled)
    }

    fn collect(&self, predicate: impl Fn(&Registration) -> bool) -> Vec<Registration> {
        self.registrations
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }
}

fn registration_not_found(id: Uuid) -> DomainError {
    DomainError::not_found("Registration", id)
}

#[async_trait]
impl RegistrationRepository for InMemoryStorage {
    async fn insert(&self, registration: Registration) -> DomainResult<Registration> {
        if self.registrations.contains_key(&registration.id) {
            return Err(DomainError::Internal(format!(
                "registration {} already exists",
                registration.id
            )));
        }
        self.registrations
            .insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Registration>> {
        Ok(self.registrations.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_child(&self, child_id: Uuid) -> DomainResult<Vec<Registration>> {
        Ok(Self::sorted_newest_first(
            self.collect(|r| r.child_id == Some(child_id)),
        ))
    }

    async fn find_by_guardian(&self, guardian_id: Uuid) -> DomainResult<Vec<Registration>> {
        Ok(Self::sorted_newest_first(
            self.collect(|r| r.guardian_id == Some(guardian_id)),
        ))
    }

    async fn find_by_occurrence(&self, occurrence_id: Uuid) -> DomainResult<Vec<Registration>> {
        Ok(Self::sorted_newest_first(
            self.collect(|r| r.event_occurrence_id == occurrence_id),
        ))
    }

    async fn find_active_for_occurrence(
        &self,
        occurrence_id: Uuid,
    ) -> DomainResult<Vec<Registration>> {
        Ok(Self::sorted_newest_first(self.collect(|r| {
            r.event_occurrence_id == occurrence_id && r.is_active()
        })))
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<Registration> {
        let mut entry = self
            .registrations
            .get_mut(&id)
            .ok_or_else(|| registration_not_found(id))?;
        entry.apply_payment_status(status, at)?;
        Ok(entry.clone())
    }

    async fn update_child(&self, id: Uuid, child_id: Uuid) -> DomainResult<Registration> {
        let mut entry = self
            .registrations
            .get_mut(&id)
            .ok_or_else(|| registration_not_found(id))?;
        entry.child_id = Some(child_id);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn cancel(&self, record: CancellationRecord) -> DomainResult<Registration> {
        let mut entry = self
            .registrations
            .get_mut(&record.registration_id)
            .ok_or_else(|| registration_not_found(record.registration_id))?;
        entry.cancel(&record)?;
        self.release_seat(entry.event_occurrence_id);
        Ok(entry.clone())
    }

    async fn cancel_for_occurrence(
        &self,
        occurrence_id: Uuid,
        records: Vec<CancellationRecord>,
    ) -> DomainResult<Vec<Registration>> {
        let mut cancelled = Vec::with_capacity(records.len());
        for record in records {
            let Some(mut entry) = self.registrations.get_mut(&record.registration_id) else {
                continue;
            };
            if entry.event_occurrence_id != occurrence_id || !entry.is_active() {
                continue;
            }
            entry.cancel(&record)?;
            self.release_seat(occurrence_id);
            cancelled.push(entry.clone());
        }
        Ok(cancelled)
    }

    async fn delete(&self, id: Uuid) -> DomainResult<Registration> {
        let (_, removed) = self
            .registrations
            .remove(&id)
            .ok_or_else(|| registration_not_found(id))?;
        if removed.is_active() {
            self.release_seat(removed.event_occurrence_id);
        }
        Ok(removed)
    }

    async fn find_due_for_capture(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Registration>> {
        let mut due = self.collect(|r| {
            r.is_active()
                && r.payment_status == PaymentStatus::RequiresCapture
                && r.occurrence_start_time >= from
                && r.occurrence_start_time <= to
                && !self.occurrence_cancelled(r.event_occurrence_id)
        });
        due.sort_by_key(|r| r.occurrence_start_time);
        Ok(due)
    }

    async fn find_due_reminders(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<ReminderTarget>> {
        let mut due = self.collect(|r| {
            r.is_active()
                && !r.reminder_sent
                && r.occurrence_start_time >= from
                && r.occurrence_start_time <= to
                && !self.occurrence_cancelled(r.event_occurrence_id)
        });
        due.sort_by_key(|r| r.occurrence_start_time);

        Ok(due
            .into_iter()
            .map(|r| {
                let guardian = r
                    .guardian_id
                    .and_then(|id| self.guardians.get(&id).map(|g| g.value().clone()));
                ReminderTarget {
                    registration_id: r.id,
                    guardian_id: r.guardian_id,
                    guardian_name: guardian.as_ref().map(|g| g.name.clone()),
                    guardian_email: guardian.and_then(|g| g.email),
                    event_name: r.event_name,
                    occurrence_start_time: r.occurrence_start_time,
                }
            })
            .collect())
    }

    async fn mark_reminder_sent(&self, id: Uuid) -> DomainResult<()> {
        let mut entry = self
            .registrations
            .get_mut(&id)
            .ok_or_else(|| registration_not_found(id))?;
        entry.reminder_sent = true;
        entry.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl OccurrenceRepository for InMemoryStorage {
    async fn insert(&self, occurrence: EventOccurrence) -> DomainResult<EventOccurrence> {
        if occurrence.max_attendees < 1 {
            return Err(DomainError::Validation(
                "max_attendees must be at least 1".into(),
            ));
        }
        self.occurrences.insert(occurrence.id, occurrence.clone());
        Ok(occurrence)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<EventOccurrence>> {
        Ok(self.occurrences.get(&id).map(|o| o.value().clone()))
    }

    async fn try_admit(&self, id: Uuid) -> DomainResult<bool> {
        match self.occurrences.get_mut(&id) {
            Some(mut occurrence) if occurrence.is_open() => {
                occurrence.curr_enrolled += 1;
                occurrence.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.release_seat(id))
    }

    async fn mark_cancelled(&self, id: Uuid) -> DomainResult<bool> {
        match self.occurrences.get_mut(&id) {
            Some(mut occurrence) if occurrence.status == OccurrenceStatus::Scheduled => {
                occurrence.status = OccurrenceStatus::Cancelled;
                occurrence.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryStorage {
    async fn find_child(&self, id: Uuid) -> DomainResult<Option<Child>> {
        Ok(self.children.get(&id).map(|c| c.value().clone()))
    }

    async fn find_guardian(&self, id: Uuid) -> DomainResult<Option<Guardian>> {
        Ok(self.guardians.get(&id).map(|g| g.value().clone()))
    }

    async fn find_organization(&self, id: Uuid) -> DomainResult<Option<Organization>> {
        Ok(self.organizations.get(&id).map(|o| o.value().clone()))
    }
}

impl RepositoryProvider for InMemoryStorage {
    fn registrations(&self) -> &dyn RegistrationRepository {
        self
    }

    fn occurrences(&self) -> &dyn OccurrenceRepository {
        self
    }

    fn directory(&self) -> &dyn DirectoryRepository {
        self
    }
}
