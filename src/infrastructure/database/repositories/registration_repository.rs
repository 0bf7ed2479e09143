//! SeaORM implementation of RegistrationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait, UpdateMany,
};
use tracing::debug;
use uuid::Uuid;

use super::occurrence_repository::release_seat;
use crate::domain::{
    payment_status_locked, BookingStatus, CancellationRecord, DomainError, DomainResult,
    OccurrenceStatus, PaymentSplit, PaymentStatus, RefundOutcome, Registration,
    RegistrationRepository, ReminderTarget,
};
use crate::infrastructure::database::entities::{event_occurrence, guardian};
use crate::infrastructure::database::entities::registration::{self, Column, Entity};

pub struct SeaOrmRegistrationRepository {
    db: DatabaseConnection,
}

impl SeaOrmRegistrationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid) -> DomainResult<Registration> {
        Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Registration", id))
            .and_then(model_to_domain)
    }

    async fn find_where(&self, filter: SimpleExpr) -> DomainResult<Vec<Registration>> {
        Entity::find()
            .filter(filter)
            .order_by_desc(Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn corrupt(id: Uuid, what: &str, value: &str) -> DomainError {
    DomainError::Internal(format!("registration {} has invalid {}: {}", id, what, value))
}

fn model_to_domain(m: registration::Model) -> DomainResult<Registration> {
    let status =
        BookingStatus::from_str(&m.status).ok_or_else(|| corrupt(m.id, "status", &m.status))?;
    let payment_status = PaymentStatus::from_str(&m.payment_status)
        .ok_or_else(|| corrupt(m.id, "payment_status", &m.payment_status))?;
    let cancellation_outcome = match m.cancellation_outcome.as_deref() {
        Some(raw) => Some(
            RefundOutcome::from_str(raw).ok_or_else(|| corrupt(m.id, "cancellation_outcome", raw))?,
        ),
        None => None,
    };
    let split = PaymentSplit::checked(m.total_amount, m.provider_amount, m.platform_fee_amount)
        .ok_or_else(|| {
            corrupt(
                m.id,
                "amounts",
                &format!(
                    "{} != {} + {}",
                    m.total_amount, m.provider_amount, m.platform_fee_amount
                ),
            )
        })?;

    Ok(Registration {
        id: m.id,
        child_id: m.child_id,
        guardian_id: m.guardian_id,
        event_occurrence_id: m.event_occurrence_id,
        status,
        payment_status,
        split,
        currency: m.currency,
        authorization_id: m.authorization_id,
        payer_account_id: m.payer_account_id,
        payee_account_id: m.payee_account_id,
        payment_method_id: m.payment_method_id,
        event_name: m.event_name,
        occurrence_start_time: m.occurrence_start_time,
        reminder_sent: m.reminder_sent,
        cancellation_outcome,
        paid_at: m.paid_at,
        cancelled_at: m.cancelled_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn domain_to_active(r: &Registration) -> registration::ActiveModel {
    registration::ActiveModel {
        id: Set(r.id),
        child_id: Set(r.child_id),
        guardian_id: Set(r.guardian_id),
        event_occurrence_id: Set(r.event_occurrence_id),
        status: Set(r.status.as_str().to_string()),
        payment_status: Set(r.payment_status.as_str().to_string()),
        total_amount: Set(r.split.total()),
        provider_amount: Set(r.split.provider()),
        platform_fee_amount: Set(r.split.platform_fee()),
        currency: Set(r.currency.clone()),
        authorization_id: Set(r.authorization_id.clone()),
        payer_account_id: Set(r.payer_account_id.clone()),
        payee_account_id: Set(r.payee_account_id.clone()),
        payment_method_id: Set(r.payment_method_id.clone()),
        event_name: Set(r.event_name.clone()),
        occurrence_start_time: Set(r.occurrence_start_time),
        reminder_sent: Set(r.reminder_sent),
        cancellation_outcome: Set(r.cancellation_outcome.map(|o| o.as_str().to_string())),
        paid_at: Set(r.paid_at),
        cancelled_at: Set(r.cancelled_at),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

/// `paid_at = COALESCE(paid_at, at)` so the first success wins.
fn stamp_paid_at(update: UpdateMany<Entity>, at: DateTime<Utc>) -> UpdateMany<Entity> {
    update.col_expr(
        Column::PaidAt,
        SimpleExpr::from(Func::coalesce([
            SimpleExpr::from(Expr::col(Column::PaidAt)),
            Expr::value(at),
        ])),
    )
}

fn with_payment_status(
    update: UpdateMany<Entity>,
    status: PaymentStatus,
    at: DateTime<Utc>,
) -> UpdateMany<Entity> {
    let update = update.col_expr(Column::PaymentStatus, Expr::value(status.as_str()));
    if status == PaymentStatus::Succeeded {
        stamp_paid_at(update, at)
    } else {
        update.filter(Column::PaymentStatus.ne(PaymentStatus::Succeeded.as_str()))
    }
}

/// Conditional flip from registered to cancelled. Matches nothing if the
/// registration was cancelled concurrently.
fn cancellation_update(record: &CancellationRecord) -> UpdateMany<Entity> {
    let update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(BookingStatus::Cancelled.as_str()))
        .col_expr(Column::CancelledAt, Expr::value(record.cancelled_at))
        .col_expr(
            Column::CancellationOutcome,
            Expr::value(record.outcome.as_str()),
        )
        .col_expr(Column::UpdatedAt, Expr::value(record.cancelled_at))
        .filter(Column::Id.eq(record.registration_id))
        .filter(Column::Status.eq(BookingStatus::Registered.as_str()));

    match record.payment_status {
        Some(status) => with_payment_status(update, status, record.cancelled_at),
        None => update,
    }
}

// ── RegistrationRepository impl ─────────────────────────────────

#[async_trait]
impl RegistrationRepository for SeaOrmRegistrationRepository {
    async fn insert(&self, registration: Registration) -> DomainResult<Registration> {
        let saved = domain_to_active(&registration).insert(&self.db).await?;
        model_to_domain(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Registration>> {
        Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_child(&self, child_id: Uuid) -> DomainResult<Vec<Registration>> {
        self.find_where(Column::ChildId.eq(child_id)).await
    }

    async fn find_by_guardian(&self, guardian_id: Uuid) -> DomainResult<Vec<Registration>> {
        self.find_where(Column::GuardianId.eq(guardian_id)).await
    }

    async fn find_by_occurrence(&self, occurrence_id: Uuid) -> DomainResult<Vec<Registration>> {
        self.find_where(Column::EventOccurrenceId.eq(occurrence_id))
            .await
    }

    async fn find_active_for_occurrence(
        &self,
        occurrence_id: Uuid,
    ) -> DomainResult<Vec<Registration>> {
        self.find_where(
            Column::EventOccurrenceId
                .eq(occurrence_id)
                .and(Column::Status.eq(BookingStatus::Registered.as_str())),
        )
        .await
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<Registration> {
        let update = Entity::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(at))
            .filter(Column::Id.eq(id));
        let result = with_payment_status(update, status, at)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            // Either missing or already paid.
            let current = self.fetch(id).await?;
            return Err(payment_status_locked(current.id, status));
        }
        self.fetch(id).await
    }

    async fn update_child(&self, id: Uuid, child_id: Uuid) -> DomainResult<Registration> {
        let result = Entity::update_many()
            .col_expr(Column::ChildId, Expr::value(child_id))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Registration", id));
        }
        self.fetch(id).await
    }

    async fn cancel(&self, record: CancellationRecord) -> DomainResult<Registration> {
        let id = record.registration_id;
        let txn = self.db.begin().await?;

        let current = Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Registration", id))?;
        let already_cancelled = DomainError::AlreadyCancelled {
            entity: "Registration",
            id,
        };
        if current.status != BookingStatus::Registered.as_str() {
            return Err(already_cancelled);
        }
        if let Some(status) = record.payment_status {
            if current.payment_status == PaymentStatus::Succeeded.as_str()
                && status != PaymentStatus::Succeeded
            {
                return Err(payment_status_locked(id, status));
            }
        }

        let result = cancellation_update(&record).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(already_cancelled);
        }
        let released = release_seat(&txn, current.event_occurrence_id).await?;
        txn.commit().await?;

        debug!(registration_id = %id, seat_released = released, "Registration cancelled");
        self.fetch(id).await
    }

    async fn cancel_for_occurrence(
        &self,
        occurrence_id: Uuid,
        records: Vec<CancellationRecord>,
    ) -> DomainResult<Vec<Registration>> {
        let txn = self.db.begin().await?;
        let mut cancelled_ids = Vec::with_capacity(records.len());

        for record in &records {
            let result = cancellation_update(record)
                .filter(Column::EventOccurrenceId.eq(occurrence_id))
                .exec(&txn)
                .await?;
            if result.rows_affected == 1 {
                release_seat(&txn, occurrence_id).await?;
                cancelled_ids.push(record.registration_id);
            }
        }
        txn.commit().await?;

        if cancelled_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_where(Column::Id.is_in(cancelled_ids)).await
    }

    async fn delete(&self, id: Uuid) -> DomainResult<Registration> {
        let txn = self.db.begin().await?;

        let model = Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Registration", id))?;
        let removed = model_to_domain(model)?;

        Entity::delete_by_id(id).exec(&txn).await?;
        if removed.is_active() {
            release_seat(&txn, removed.event_occurrence_id).await?;
        }
        txn.commit().await?;

        Ok(removed)
    }

    async fn find_due_for_capture(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Registration>> {
        Entity::find()
            .join(JoinType::InnerJoin, registration::Relation::EventOccurrence.def())
            .filter(event_occurrence::Column::Status.ne(OccurrenceStatus::Cancelled.as_str()))
            .filter(Column::Status.eq(BookingStatus::Registered.as_str()))
            .filter(Column::PaymentStatus.eq(PaymentStatus::RequiresCapture.as_str()))
            .filter(Column::OccurrenceStartTime.between(from, to))
            .order_by_asc(Column::OccurrenceStartTime)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn find_due_reminders(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<ReminderTarget>> {
        let rows = Entity::find()
            .find_also_related(guardian::Entity)
            .join(JoinType::InnerJoin, registration::Relation::EventOccurrence.def())
            .filter(event_occurrence::Column::Status.ne(OccurrenceStatus::Cancelled.as_str()))
            .filter(Column::Status.eq(BookingStatus::Registered.as_str()))
            .filter(Column::ReminderSent.eq(false))
            .filter(Column::OccurrenceStartTime.between(from, to))
            .order_by_asc(Column::OccurrenceStartTime)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(r, g)| ReminderTarget {
                registration_id: r.id,
                guardian_id: r.guardian_id,
                guardian_name: g.as_ref().map(|g| g.name.clone()),
                guardian_email: g.and_then(|g| g.email),
                event_name: r.event_name,
                occurrence_start_time: r.occurrence_start_time,
            })
            .collect())
    }

    async fn mark_reminder_sent(&self, id: Uuid) -> DomainResult<()> {
        let result = Entity::update_many()
            .col_expr(Column::ReminderSent, Expr::value(true))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Registration", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewRegistration, OccurrenceRepository};
    use crate::infrastructure::database::repositories::SeaOrmOccurrenceRepository;
    use crate::infrastructure::database::test_support::{seed, test_db, Seed};
    use chrono::Duration;

    fn booking(s: &Seed, starts_in: Duration) -> Registration {
        Registration::new(NewRegistration {
            child_id: s.child_id,
            guardian_id: s.guardian_id,
            event_occurrence_id: s.occurrence_id,
            payment_status: PaymentStatus::RequiresCapture,
            split: PaymentSplit::checked(10_000, 9_000, 1_000).unwrap(),
            currency: "thb".into(),
            authorization_id: format!("pi_{}", Uuid::new_v4().simple()),
            payer_account_id: "cus_1".into(),
            payee_account_id: "acct_1".into(),
            payment_method_id: Some("pm_1".into()),
            event_name: "Lego Robotics".into(),
            occurrence_start_time: Utc::now() + starts_in,
        })
    }

    async fn setup(
        max_attendees: i32,
        starts_in: Duration,
    ) -> (
        SeaOrmRegistrationRepository,
        SeaOrmOccurrenceRepository,
        Seed,
    ) {
        let db = test_db().await;
        let s = seed(&db, max_attendees, starts_in).await;
        (
            SeaOrmRegistrationRepository::new(db.clone()),
            SeaOrmOccurrenceRepository::new(db),
            s,
        )
    }

    async fn enrolled(occurrences: &SeaOrmOccurrenceRepository, id: Uuid) -> i32 {
        occurrences.find_by_id(id).await.unwrap().unwrap().curr_enrolled
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let (repo, _, s) = setup(5, Duration::days(3)).await;
        let r = repo.insert(booking(&s, Duration::days(3))).await.unwrap();

        let found = repo.find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(found.id, r.id);
        assert_eq!(found.split.platform_fee(), 1_000);
        assert_eq!(found.status, BookingStatus::Registered);
        assert_eq!(found.payment_status, PaymentStatus::RequiresCapture);

        assert_eq!(repo.find_by_child(s.child_id).await.unwrap().len(), 1);
        assert_eq!(repo.find_by_guardian(s.guardian_id).await.unwrap().len(), 1);
        assert_eq!(repo.find_by_occurrence(s.occurrence_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancel_releases_seat_in_same_transaction() {
        let (repo, occurrences, s) = setup(5, Duration::days(3)).await;
        assert!(occurrences.try_admit(s.occurrence_id).await.unwrap());
        let r = repo.insert(booking(&s, Duration::days(3))).await.unwrap();

        let cancelled = repo
            .cancel(CancellationRecord {
                registration_id: r.id,
                outcome: RefundOutcome::Voided,
                payment_status: Some(PaymentStatus::Canceled),
                cancelled_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Canceled);
        assert_eq!(cancelled.cancellation_outcome, Some(RefundOutcome::Voided));
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(enrolled(&occurrences, s.occurrence_id).await, 0);
    }

    #[tokio::test]
    async fn second_cancel_is_rejected_and_seat_released_once() {
        let (repo, occurrences, s) = setup(5, Duration::days(3)).await;
        occurrences.try_admit(s.occurrence_id).await.unwrap();
        occurrences.try_admit(s.occurrence_id).await.unwrap();
        let r = repo.insert(booking(&s, Duration::days(3))).await.unwrap();

        let record = CancellationRecord {
            registration_id: r.id,
            outcome: RefundOutcome::NoRefundNeeded,
            payment_status: None,
            cancelled_at: Utc::now(),
        };
        repo.cancel(record.clone()).await.unwrap();
        assert!(matches!(
            repo.cancel(record).await,
            Err(DomainError::AlreadyCancelled { .. })
        ));
        assert_eq!(enrolled(&occurrences, s.occurrence_id).await, 1);
    }

    #[tokio::test]
    async fn cancel_unknown_registration_is_not_found() {
        let (repo, _, _) = setup(5, Duration::days(3)).await;
        let result = repo
            .cancel(CancellationRecord {
                registration_id: Uuid::new_v4(),
                outcome: RefundOutcome::NoRefundNeeded,
                payment_status: None,
                cancelled_at: Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn paid_at_is_stamped_once() {
        let (repo, _, s) = setup(5, Duration::days(3)).await;
        let r = repo.insert(booking(&s, Duration::days(3))).await.unwrap();

        let first = repo
            .update_payment_status(r.id, PaymentStatus::Succeeded, Utc::now())
            .await
            .unwrap();
        let paid_at = first.paid_at.expect("paid_at set");

        let second = repo
            .update_payment_status(
                r.id,
                PaymentStatus::Succeeded,
                Utc::now() + Duration::hours(2),
            )
            .await
            .unwrap();
        assert_eq!(second.paid_at, Some(paid_at));
    }

    #[tokio::test]
    async fn paid_registration_keeps_succeeded_and_paid_at() {
        let (repo, _, s) = setup(5, Duration::days(3)).await;
        let r = repo.insert(booking(&s, Duration::days(3))).await.unwrap();
        let paid = repo
            .update_payment_status(r.id, PaymentStatus::Succeeded, Utc::now())
            .await
            .unwrap();

        assert!(matches!(
            repo.update_payment_status(r.id, PaymentStatus::Processing, Utc::now())
                .await,
            Err(DomainError::Validation(_))
        ));
        let current = repo.find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(current.payment_status, PaymentStatus::Succeeded);
        assert_eq!(current.paid_at, paid.paid_at);
    }

    #[tokio::test]
    async fn update_payment_status_of_unknown_registration_fails() {
        let (repo, _, _) = setup(5, Duration::days(3)).await;
        let result = repo
            .update_payment_status(Uuid::new_v4(), PaymentStatus::Processing, Utc::now())
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn cancel_for_occurrence_skips_inactive_registrations() {
        let (repo, occurrences, s) = setup(5, Duration::days(3)).await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            occurrences.try_admit(s.occurrence_id).await.unwrap();
            ids.push(repo.insert(booking(&s, Duration::days(3))).await.unwrap().id);
        }
        let now = Utc::now();
        repo.cancel(CancellationRecord {
            registration_id: ids[0],
            outcome: RefundOutcome::Voided,
            payment_status: Some(PaymentStatus::Canceled),
            cancelled_at: now,
        })
        .await
        .unwrap();

        let records = ids
            .iter()
            .map(|id| CancellationRecord {
                registration_id: *id,
                outcome: RefundOutcome::Voided,
                payment_status: Some(PaymentStatus::Canceled),
                cancelled_at: now,
            })
            .collect();
        let cancelled = repo
            .cancel_for_occurrence(s.occurrence_id, records)
            .await
            .unwrap();

        assert_eq!(cancelled.len(), 2);
        assert_eq!(enrolled(&occurrences, s.occurrence_id).await, 0);
        assert!(repo
            .find_active_for_occurrence(s.occurrence_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_frees_the_seat_of_an_active_registration() {
        let (repo, occurrences, s) = setup(5, Duration::days(3)).await;
        occurrences.try_admit(s.occurrence_id).await.unwrap();
        let r = repo.insert(booking(&s, Duration::days(3))).await.unwrap();

        repo.delete(r.id).await.unwrap();
        assert!(repo.find_by_id(r.id).await.unwrap().is_none());
        assert_eq!(enrolled(&occurrences, s.occurrence_id).await, 0);
        assert!(matches!(
            repo.delete(r.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn capture_window_only_includes_uncaptured_bookings_inside_it() {
        let (repo, _, s) = setup(5, Duration::hours(6)).await;
        let soon = repo.insert(booking(&s, Duration::hours(6))).await.unwrap();
        let later = repo.insert(booking(&s, Duration::days(4))).await.unwrap();
        let paid = repo.insert(booking(&s, Duration::hours(8))).await.unwrap();
        repo.update_payment_status(paid.id, PaymentStatus::Succeeded, Utc::now())
            .await
            .unwrap();

        let now = Utc::now();
        let due = repo
            .find_due_for_capture(now, now + Duration::hours(24))
            .await
            .unwrap();
        let ids: Vec<Uuid> = due.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![soon.id]);
        assert!(!ids.contains(&later.id));
    }

    #[tokio::test]
    async fn cancelled_occurrences_are_left_out_of_batch_queries() {
        let (repo, occurrences, s) = setup(5, Duration::hours(6)).await;
        repo.insert(booking(&s, Duration::hours(6))).await.unwrap();
        assert!(occurrences.mark_cancelled(s.occurrence_id).await.unwrap());

        let now = Utc::now();
        let window_end = now + Duration::hours(24);
        assert!(repo.find_due_for_capture(now, window_end).await.unwrap().is_empty());
        assert!(repo.find_due_reminders(now, window_end).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn due_reminders_carry_guardian_contact_and_clear_after_marking() {
        let (repo, _, s) = setup(5, Duration::hours(3)).await;
        let r = repo.insert(booking(&s, Duration::hours(3))).await.unwrap();

        let now = Utc::now();
        let due = repo
            .find_due_reminders(now, now + Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].registration_id, r.id);
        assert_eq!(due[0].guardian_name.as_deref(), Some("Dana"));
        assert_eq!(due[0].guardian_email.as_deref(), Some("dana@example.com"));

        repo.mark_reminder_sent(r.id).await.unwrap();
        assert!(repo
            .find_due_reminders(now, now + Duration::hours(24))
            .await
            .unwrap()
            .is_empty());
    }
}
