//! Registration Lifecycle Service
//!
//! Booking, cancellation and payment-status updates. Booking is a saga:
//! seat first, then the authorization, then the row; anything that fails
//! unwinds what came before it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::capacity::CapacityController;
use super::payments::{AuthorizationParams, PaymentCoordinator};
use crate::domain::{
    CancellationRecord, DomainError, DomainResult, NewRegistration, PaymentStatus, ProcessorError,
    RefundOutcome, Registration, RepositoryProvider,
};
use crate::shared::{RetryConfig, Saga};

#[derive(Debug, Clone)]
pub struct CreateRegistration {
    pub child_id: Uuid,
    pub guardian_id: Uuid,
    pub event_occurrence_id: Uuid,
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedRegistration {
    pub registration: Registration,
    /// Lets the client finish confirmation when the processor asks for it.
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CancellationResult {
    pub outcome: RefundOutcome,
    pub registration: Registration,
}

pub struct RegistrationService {
    repos: Arc<dyn RepositoryProvider>,
    capacity: Arc<CapacityController>,
    payments: Arc<PaymentCoordinator>,
    compensation_retry: RetryConfig,
}

impl RegistrationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        capacity: Arc<CapacityController>,
        payments: Arc<PaymentCoordinator>,
    ) -> Self {
        Self {
            repos,
            capacity,
            payments,
            compensation_retry: RetryConfig::default(),
        }
    }

    pub fn with_compensation_retry(mut self, retry: RetryConfig) -> Self {
        self.compensation_retry = retry;
        self
    }

    /// Book a child onto an occurrence.
    ///
    /// All referential checks run before the seat is taken. Once the seat
    /// is held, a failed authorization releases it and a failed insert also
    /// voids the authorization.
    pub async fn create(&self, request: CreateRegistration) -> DomainResult<CreatedRegistration> {
        let directory = self.repos.directory();

        let child = directory
            .find_child(request.child_id)
            .await?
            .ok_or_else(|| invalid(format!("child {} does not exist", request.child_id)))?;
        let guardian = directory
            .find_guardian(request.guardian_id)
            .await?
            .ok_or_else(|| invalid(format!("guardian {} does not exist", request.guardian_id)))?;
        let occurrence = self
            .repos
            .occurrences()
            .find_by_id(request.event_occurrence_id)
            .await?
            .ok_or_else(|| {
                invalid(format!(
                    "event occurrence {} does not exist",
                    request.event_occurrence_id
                ))
            })?;

        if child.guardian_id != guardian.id {
            return Err(invalid(format!(
                "child {} does not belong to guardian {}",
                child.id, guardian.id
            )));
        }
        let payer_account_id = guardian
            .payment_account_id
            .filter(|acct| !acct.trim().is_empty())
            .ok_or_else(|| invalid(format!("guardian {} has no payment account", guardian.id)))?;
        let organization = directory
            .find_organization(occurrence.organization_id)
            .await?
            .ok_or_else(|| {
                invalid(format!(
                    "organization {} does not exist",
                    occurrence.organization_id
                ))
            })?;
        let payee_account_id = organization
            .connected_account_id
            .filter(|acct| !acct.trim().is_empty())
            .ok_or_else(|| {
                invalid(format!(
                    "organization {} cannot receive payments",
                    organization.id
                ))
            })?;
        let payment_method_id = request
            .payment_method_id
            .filter(|pm| !pm.trim().is_empty())
            .ok_or(ProcessorError::PaymentMethodRequired)?;

        let mut saga = Saga::new("create_registration").with_retry(self.compensation_retry.clone());

        saga.step("reserve_seat", self.capacity.try_admit(occurrence.id))
            .await?;
        let capacity = self.capacity.clone();
        let occurrence_id = occurrence.id;
        saga.on_rollback("release_seat", move || {
            let capacity = capacity.clone();
            async move { capacity.release(occurrence_id).await }
        });

        let authorization = saga
            .step(
                "authorize_payment",
                self.payments.create_authorization(AuthorizationParams {
                    amount: occurrence.price,
                    currency: occurrence.currency.clone(),
                    payer_account_id: payer_account_id.clone(),
                    payee_account_id: payee_account_id.clone(),
                    payment_method_id: Some(payment_method_id.clone()),
                    event_occurrence_id: occurrence.id,
                    event_date: occurrence.start_time,
                }),
            )
            .await?;
        let payments = self.payments.clone();
        let authorization_id = authorization.authorization_id.clone();
        let payee = payee_account_id.clone();
        saga.on_rollback("void_authorization", move || {
            let payments = payments.clone();
            let authorization_id = authorization_id.clone();
            let payee = payee.clone();
            async move { payments.void(&authorization_id, &payee).await.map(|_| ()) }
        });

        let registration = Registration::new(NewRegistration {
            child_id: child.id,
            guardian_id: guardian.id,
            event_occurrence_id: occurrence.id,
            payment_status: authorization.status,
            split: authorization.split,
            currency: authorization.currency,
            authorization_id: authorization.authorization_id,
            payer_account_id,
            payee_account_id,
            payment_method_id: Some(payment_method_id),
            event_name: occurrence.event_name,
            occurrence_start_time: occurrence.start_time,
        });
        let registration = saga
            .step("persist_registration", self.repos.registrations().insert(registration))
            .await?;
        saga.complete();

        metrics::counter!("registrations_created_total").increment(1);
        info!(
            registration_id = %registration.id,
            occurrence_id = %registration.event_occurrence_id,
            amount = registration.split.total(),
            payment_status = %registration.payment_status,
            "🎟️ Registration created"
        );

        Ok(CreatedRegistration {
            registration,
            client_secret: authorization.client_secret,
        })
    }

    /// Cancel a registration, returning or releasing its money first.
    pub async fn cancel(&self, id: Uuid) -> DomainResult<CancellationResult> {
        let registration = self.get(id).await?;
        if !registration.is_active() {
            return Err(DomainError::AlreadyCancelled {
                entity: "Registration",
                id,
            });
        }

        let (outcome, payment_status) =
            match self.payments.settle_for_cancellation(&registration).await {
                Ok(settled) => settled,
                Err(e) => {
                    // A concurrent cancel may have settled first and taken the row.
                    let current = self.repos.registrations().find_by_id(id).await?;
                    if current.is_some_and(|r| !r.is_active()) {
                        return Err(DomainError::AlreadyCancelled {
                            entity: "Registration",
                            id,
                        });
                    }
                    return Err(e);
                }
            };

        let cancelled = self
            .repos
            .registrations()
            .cancel(CancellationRecord {
                registration_id: id,
                outcome,
                payment_status,
                cancelled_at: Utc::now(),
            })
            .await
            .inspect_err(|e| {
                warn!(
                    registration_id = %id,
                    outcome = %outcome,
                    error = %e,
                    "Money settled but registration not marked cancelled"
                )
            })?;

        metrics::counter!("registrations_cancelled_total", "outcome" => outcome.as_str())
            .increment(1);
        info!(registration_id = %id, outcome = %outcome, "Registration cancelled");

        Ok(CancellationResult {
            outcome,
            registration: cancelled,
        })
    }

    /// Record a payment status reported by the processor. Booking status
    /// and seats are left alone.
    pub async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> DomainResult<Registration> {
        self.repos
            .registrations()
            .update_payment_status(id, status, Utc::now())
            .await
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Registration> {
        self.repos
            .registrations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Registration", id))
    }

    pub async fn list_by_child(&self, child_id: Uuid) -> DomainResult<Vec<Registration>> {
        self.repos.registrations().find_by_child(child_id).await
    }

    pub async fn list_by_guardian(&self, guardian_id: Uuid) -> DomainResult<Vec<Registration>> {
        self.repos.registrations().find_by_guardian(guardian_id).await
    }

    pub async fn list_by_occurrence(&self, occurrence_id: Uuid) -> DomainResult<Vec<Registration>> {
        self.repos
            .registrations()
            .find_by_occurrence(occurrence_id)
            .await
    }

    /// Move an active registration to another child of the same guardian.
    pub async fn update_child(&self, id: Uuid, child_id: Uuid) -> DomainResult<Registration> {
        let registration = self.get(id).await?;
        if !registration.is_active() {
            return Err(DomainError::AlreadyCancelled {
                entity: "Registration",
                id,
            });
        }

        let child = self
            .repos
            .directory()
            .find_child(child_id)
            .await?
            .ok_or_else(|| invalid(format!("child {} does not exist", child_id)))?;
        if registration.guardian_id != Some(child.guardian_id) {
            return Err(invalid(format!(
                "child {} does not belong to the registration's guardian",
                child_id
            )));
        }

        self.repos.registrations().update_child(id, child_id).await
    }

    /// Administrative removal. Frees the seat if the registration held one;
    /// money is not touched.
    pub async fn delete(&self, id: Uuid) -> DomainResult<Registration> {
        let removed = self.repos.registrations().delete(id).await?;
        info!(
            registration_id = %id,
            was_active = removed.is_active(),
            "Registration deleted"
        );
        Ok(removed)
    }
}

fn invalid(message: String) -> DomainError {
    DomainError::Validation(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};

    use crate::domain::{
        BookingStatus, Child, DirectoryRepository, EventOccurrence, FeePolicy, Guardian,
        OccurrenceRepository, OccurrenceStatus, Organization, PaymentProcessor,
        RegistrationRepository, ReminderTarget,
    };
    use crate::infrastructure::{InMemoryPaymentProcessor, InMemoryStorage, ProcessorOperation};

    struct Fixture {
        storage: Arc<InMemoryStorage>,
        processor: Arc<InMemoryPaymentProcessor>,
        service: Arc<RegistrationService>,
        guardian_id: Uuid,
        child_id: Uuid,
        occurrence_id: Uuid,
    }

    fn quick_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 2,
            initial_delay: std::time::Duration::from_millis(1),
            backoff_multiplier: 1.0,
            max_delay: std::time::Duration::from_millis(1),
        }
    }

    fn build_service(
        repos: Arc<dyn RepositoryProvider>,
        processor: Arc<InMemoryPaymentProcessor>,
    ) -> RegistrationService {
        let payments = Arc::new(PaymentCoordinator::new(
            processor,
            FeePolicy::default(),
            std::time::Duration::from_secs(2),
        ));
        let capacity = Arc::new(CapacityController::new(
            repos.clone(),
            payments.clone(),
            Duration::hours(24),
        ));
        RegistrationService::new(repos, capacity, payments).with_compensation_retry(quick_retry())
    }

    async fn seed(storage: &InMemoryStorage, max_attendees: i32) -> (Uuid, Uuid, Uuid) {
        let organization_id = Uuid::new_v4();
        let guardian_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        let occurrence_id = Uuid::new_v4();
        let now = Utc::now();

        storage.add_organization(Organization {
            id: organization_id,
            name: "Little Makers".into(),
            connected_account_id: Some("acct_1".into()),
        });
        storage.add_guardian(Guardian {
            id: guardian_id,
            name: "Dana".into(),
            email: Some("dana@example.com".into()),
            payment_account_id: Some("cus_1".into()),
        });
        storage.add_child(Child {
            id: child_id,
            guardian_id,
            name: "Sam".into(),
        });
        let occurrence = EventOccurrence {
            id: occurrence_id,
            event_name: "Lego Robotics".into(),
            organization_id,
            start_time: now + Duration::days(3),
            end_time: now + Duration::days(3) + Duration::hours(2),
            max_attendees,
            curr_enrolled: 0,
            price: 10_000,
            currency: "thb".into(),
            status: OccurrenceStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        storage.occurrences().insert(occurrence).await.unwrap();
        (guardian_id, child_id, occurrence_id)
    }

    async fn fixture(max_attendees: i32) -> Fixture {
        let storage = Arc::new(InMemoryStorage::new());
        let processor = Arc::new(InMemoryPaymentProcessor::new());
        let (guardian_id, child_id, occurrence_id) = seed(&storage, max_attendees).await;
        let service = Arc::new(build_service(storage.clone(), processor.clone()));
        Fixture {
            storage,
            processor,
            service,
            guardian_id,
            child_id,
            occurrence_id,
        }
    }

    impl Fixture {
        fn request(&self) -> CreateRegistration {
            CreateRegistration {
                child_id: self.child_id,
                guardian_id: self.guardian_id,
                event_occurrence_id: self.occurrence_id,
                payment_method_id: Some("pm_card_visa".into()),
            }
        }

        fn add_child(&self) -> Uuid {
            let id = Uuid::new_v4();
            self.storage.add_child(Child {
                id,
                guardian_id: self.guardian_id,
                name: "Alex".into(),
            });
            id
        }

        async fn enrolled(&self) -> i32 {
            self.storage
                .occurrences()
                .find_by_id(self.occurrence_id)
                .await
                .unwrap()
                .unwrap()
                .curr_enrolled
        }
    }

    #[tokio::test]
    async fn booking_authorizes_with_fee_split() {
        let f = fixture(5).await;
        let created = f.service.create(f.request()).await.unwrap();
        let r = &created.registration;

        assert_eq!(r.status, BookingStatus::Registered);
        assert_eq!(r.payment_status, PaymentStatus::RequiresCapture);
        assert_eq!(r.split.total(), 10_000);
        assert_eq!(r.split.provider(), 9_000);
        assert_eq!(r.split.platform_fee(), 1_000);
        assert_eq!(r.payee_account_id, "acct_1");
        assert_eq!(r.payer_account_id, "cus_1");
        assert_eq!(r.event_name, "Lego Robotics");
        assert!(r.paid_at.is_none());
        assert!(created.client_secret.is_some());
        assert_eq!(f.enrolled().await, 1);
    }

    #[tokio::test]
    async fn last_seat_goes_to_exactly_one_of_two_concurrent_bookings() {
        let f = fixture(1).await;
        let second_child = f.add_child();

        let a = {
            let service = f.service.clone();
            let request = f.request();
            tokio::spawn(async move { service.create(request).await })
        };
        let b = {
            let service = f.service.clone();
            let request = CreateRegistration {
                child_id: second_child,
                ..f.request()
            };
            tokio::spawn(async move { service.create(request).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let full = results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::CapacityExceeded { .. })))
            .count();
        assert_eq!((ok, full), (1, 1));
        assert_eq!(f.enrolled().await, 1);
        assert_eq!(f.processor.call_count(ProcessorOperation::CreateIntent), 1);
    }

    #[tokio::test]
    async fn referential_problems_are_validation_errors_without_side_effects() {
        let f = fixture(5).await;

        let unknown_child = CreateRegistration {
            child_id: Uuid::new_v4(),
            ..f.request()
        };
        let foreign_child_id = Uuid::new_v4();
        f.storage.add_child(Child {
            id: foreign_child_id,
            guardian_id: Uuid::new_v4(),
            name: "Other".into(),
        });
        let foreign_child = CreateRegistration {
            child_id: foreign_child_id,
            ..f.request()
        };
        let unknown_occurrence = CreateRegistration {
            event_occurrence_id: Uuid::new_v4(),
            ..f.request()
        };

        for request in [unknown_child, foreign_child, unknown_occurrence] {
            assert!(matches!(
                f.service.create(request).await,
                Err(DomainError::Validation(_))
            ));
        }
        assert_eq!(f.enrolled().await, 0);
        assert!(f.processor.calls().is_empty());
    }

    #[tokio::test]
    async fn guardian_without_payment_account_is_rejected() {
        let f = fixture(5).await;
        f.storage.add_guardian(Guardian {
            id: f.guardian_id,
            name: "Dana".into(),
            email: None,
            payment_account_id: None,
        });
        assert!(matches!(
            f.service.create(f.request()).await,
            Err(DomainError::Validation(_))
        ));
        assert_eq!(f.enrolled().await, 0);
    }

    #[tokio::test]
    async fn missing_payment_method_takes_no_seat() {
        let f = fixture(5).await;
        let request = CreateRegistration {
            payment_method_id: None,
            ..f.request()
        };
        assert!(matches!(
            f.service.create(request).await,
            Err(DomainError::Processor(ProcessorError::PaymentMethodRequired))
        ));
        assert_eq!(f.enrolled().await, 0);
    }

    #[tokio::test]
    async fn declined_card_releases_the_seat() {
        let f = fixture(1).await;
        f.processor.fail_next(
            ProcessorOperation::CreateIntent,
            ProcessorError::Declined {
                code: Some("card_declined".into()),
                message: "Your card was declined.".into(),
            },
        );

        let err = f.service.create(f.request()).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Processor(ProcessorError::Declined { .. })
        ));
        assert_eq!(f.enrolled().await, 0);

        // The seat is bookable again.
        f.service.create(f.request()).await.unwrap();
        assert_eq!(f.enrolled().await, 1);
    }

    #[tokio::test]
    async fn cancelling_paid_registration_refunds_and_frees_seat() {
        let f = fixture(5).await;
        let created = f.service.create(f.request()).await.unwrap();
        let id = created.registration.id;
        f.processor
            .capture_intent(&created.registration.authorization_id, "acct_1")
            .await
            .unwrap();
        f.service
            .update_payment_status(id, PaymentStatus::Succeeded)
            .await
            .unwrap();

        let result = f.service.cancel(id).await.unwrap();
        assert_eq!(result.outcome, RefundOutcome::Refunded);
        assert_eq!(result.outcome.as_str(), "succeeded");
        assert_eq!(result.registration.status, BookingStatus::Cancelled);
        assert_eq!(result.registration.payment_status, PaymentStatus::Succeeded);
        assert!(result.registration.cancelled_at.is_some());
        assert_eq!(f.enrolled().await, 0);
        assert_eq!(f.processor.call_count(ProcessorOperation::Refund), 1);
        assert_eq!(f.processor.call_count(ProcessorOperation::Cancel), 0);
    }

    #[tokio::test]
    async fn cancelling_held_registration_voids_it() {
        let f = fixture(5).await;
        let id = f.service.create(f.request()).await.unwrap().registration.id;

        let result = f.service.cancel(id).await.unwrap();
        assert_eq!(result.outcome, RefundOutcome::Voided);
        assert_eq!(result.registration.payment_status, PaymentStatus::Canceled);
        assert_eq!(f.processor.call_count(ProcessorOperation::Cancel), 1);
        assert_eq!(f.processor.call_count(ProcessorOperation::Refund), 0);
    }

    #[tokio::test]
    async fn second_cancel_does_nothing() {
        let f = fixture(5).await;
        let id = f.service.create(f.request()).await.unwrap().registration.id;
        f.service.cancel(id).await.unwrap();

        assert!(matches!(
            f.service.cancel(id).await,
            Err(DomainError::AlreadyCancelled { .. })
        ));
        assert_eq!(f.processor.call_count(ProcessorOperation::Cancel), 1);
        assert_eq!(f.enrolled().await, 0);
    }

    #[tokio::test]
    async fn losing_concurrent_cancel_reports_already_cancelled() {
        let storage = Arc::new(InMemoryStorage::new());
        let processor = Arc::new(
            InMemoryPaymentProcessor::new().with_latency(std::time::Duration::from_millis(50)),
        );
        let (guardian_id, child_id, occurrence_id) = seed(&storage, 5).await;
        let service = build_service(storage.clone(), processor.clone());
        let id = service
            .create(CreateRegistration {
                child_id,
                guardian_id,
                event_occurrence_id: occurrence_id,
                payment_method_id: Some("pm_card_visa".into()),
            })
            .await
            .unwrap()
            .registration
            .id;

        let (a, b) = tokio::join!(service.cancel(id), service.cancel(id));
        let (won, lost) = if a.is_ok() { (a, b) } else { (b, a) };
        assert_eq!(won.unwrap().outcome, RefundOutcome::Voided);
        assert!(matches!(lost, Err(DomainError::AlreadyCancelled { .. })));

        let occurrence = storage
            .occurrences()
            .find_by_id(occurrence_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(occurrence.curr_enrolled, 0);
    }

    #[tokio::test]
    async fn failed_void_keeps_registration_active() {
        let f = fixture(5).await;
        let id = f.service.create(f.request()).await.unwrap().registration.id;
        f.processor
            .fail_next(ProcessorOperation::Cancel, ProcessorError::Timeout(2));

        assert!(f.service.cancel(id).await.is_err());
        let r = f.service.get(id).await.unwrap();
        assert!(r.is_active());
        assert!(r.cancelled_at.is_none());
        assert_eq!(f.enrolled().await, 1);
    }

    #[tokio::test]
    async fn payment_status_update_stamps_paid_at_once() {
        let f = fixture(5).await;
        let id = f.service.create(f.request()).await.unwrap().registration.id;

        let paid = f
            .service
            .update_payment_status(id, PaymentStatus::Succeeded)
            .await
            .unwrap();
        let paid_at = paid.paid_at.expect("paid_at");
        let again = f
            .service
            .update_payment_status(id, PaymentStatus::Succeeded)
            .await
            .unwrap();
        assert_eq!(again.paid_at, Some(paid_at));
        assert_eq!(again.status, BookingStatus::Registered);

        assert!(matches!(
            f.service
                .update_payment_status(Uuid::new_v4(), PaymentStatus::Processing)
                .await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn paid_registration_cannot_fall_back_to_unpaid() {
        let f = fixture(5).await;
        let id = f.service.create(f.request()).await.unwrap().registration.id;
        f.service
            .update_payment_status(id, PaymentStatus::Succeeded)
            .await
            .unwrap();

        assert!(matches!(
            f.service
                .update_payment_status(id, PaymentStatus::Processing)
                .await,
            Err(DomainError::Validation(_))
        ));
        let r = f.service.get(id).await.unwrap();
        assert_eq!(r.payment_status, PaymentStatus::Succeeded);
        assert!(r.paid_at.is_some());
    }

    #[tokio::test]
    async fn child_can_be_swapped_within_the_family_only() {
        let f = fixture(5).await;
        let id = f.service.create(f.request()).await.unwrap().registration.id;
        let sibling = f.add_child();

        let updated = f.service.update_child(id, sibling).await.unwrap();
        assert_eq!(updated.child_id, Some(sibling));
        assert_eq!(f.service.list_by_child(sibling).await.unwrap().len(), 1);

        let stranger = Uuid::new_v4();
        f.storage.add_child(Child {
            id: stranger,
            guardian_id: Uuid::new_v4(),
            name: "Kim".into(),
        });
        assert!(matches!(
            f.service.update_child(id, stranger).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn delete_frees_seat_without_touching_money() {
        let f = fixture(5).await;
        let id = f.service.create(f.request()).await.unwrap().registration.id;

        let removed = f.service.delete(id).await.unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(f.enrolled().await, 0);
        assert!(matches!(
            f.service.get(id).await,
            Err(DomainError::NotFound { .. })
        ));
        assert_eq!(f.processor.call_count(ProcessorOperation::Cancel), 0);
    }

    #[tokio::test]
    async fn listings_are_scoped() {
        let f = fixture(5).await;
        f.service.create(f.request()).await.unwrap();
        f.service.create(f.request()).await.unwrap();

        assert_eq!(f.service.list_by_guardian(f.guardian_id).await.unwrap().len(), 2);
        assert_eq!(f.service.list_by_occurrence(f.occurrence_id).await.unwrap().len(), 2);
        assert!(f.service.list_by_child(Uuid::new_v4()).await.unwrap().is_empty());
    }

    /// Store whose registration inserts always fail.
    struct BrokenInsert(Arc<InMemoryStorage>);

    #[async_trait]
    impl RegistrationRepository for BrokenInsert {
        async fn insert(&self, _: Registration) -> DomainResult<Registration> {
            Err(DomainError::Validation("insert rejected".into()))
        }
        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Registration>> {
            self.0.registrations().find_by_id(id).await
        }
        async fn find_by_child(&self, id: Uuid) -> DomainResult<Vec<Registration>> {
            self.0.registrations().find_by_child(id).await
        }
        async fn find_by_guardian(&self, id: Uuid) -> DomainResult<Vec<Registration>> {
            self.0.registrations().find_by_guardian(id).await
        }
        async fn find_by_occurrence(&self, id: Uuid) -> DomainResult<Vec<Registration>> {
            self.0.registrations().find_by_occurrence(id).await
        }
        async fn find_active_for_occurrence(&self, id: Uuid) -> DomainResult<Vec<Registration>> {
            self.0.registrations().find_active_for_occurrence(id).await
        }
        async fn update_payment_status(
            &self,
            id: Uuid,
            status: PaymentStatus,
            at: DateTime<Utc>,
        ) -> DomainResult<Registration> {
            self.0.registrations().update_payment_status(id, status, at).await
        }
        async fn update_child(&self, id: Uuid, child_id: Uuid) -> DomainResult<Registration> {
            self.0.registrations().update_child(id, child_id).await
        }
        async fn cancel(&self, record: CancellationRecord) -> DomainResult<Registration> {
            self.0.registrations().cancel(record).await
        }
        async fn cancel_for_occurrence(
            &self,
            id: Uuid,
            records: Vec<CancellationRecord>,
        ) -> DomainResult<Vec<Registration>> {
            self.0.registrations().cancel_for_occurrence(id, records).await
        }
        async fn delete(&self, id: Uuid) -> DomainResult<Registration> {
            self.0.registrations().delete(id).await
        }
        async fn find_due_for_capture(
            &self,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> DomainResult<Vec<Registration>> {
            self.0.registrations().find_due_for_capture(from, to).await
        }
        async fn find_due_reminders(
            &self,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> DomainResult<Vec<ReminderTarget>> {
            self.0.registrations().find_due_reminders(from, to).await
        }
        async fn mark_reminder_sent(&self, id: Uuid) -> DomainResult<()> {
            self.0.registrations().mark_reminder_sent(id).await
        }
    }

    impl RepositoryProvider for BrokenInsert {
        fn registrations(&self) -> &dyn RegistrationRepository {
            self
        }
        fn occurrences(&self) -> &dyn OccurrenceRepository {
            self.0.occurrences()
        }
        fn directory(&self) -> &dyn DirectoryRepository {
            self.0.directory()
        }
    }

    #[tokio::test]
    async fn failed_persist_voids_authorization_then_releases_seat() {
        let storage = Arc::new(InMemoryStorage::new());
        let processor = Arc::new(InMemoryPaymentProcessor::new());
        let (guardian_id, child_id, occurrence_id) = seed(&storage, 1).await;
        let service = build_service(Arc::new(BrokenInsert(storage.clone())), processor.clone());

        let err = service
            .create(CreateRegistration {
                child_id,
                guardian_id,
                event_occurrence_id: occurrence_id,
                payment_method_id: Some("pm_card_visa".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let calls: Vec<ProcessorOperation> = processor.calls().into_iter().map(|(op, _)| op).collect();
        assert_eq!(
            calls,
            vec![ProcessorOperation::CreateIntent, ProcessorOperation::Cancel]
        );
        let occurrence = storage.occurrences().find_by_id(occurrence_id).await.unwrap().unwrap();
        assert_eq!(occurrence.curr_enrolled, 0);
    }
}
