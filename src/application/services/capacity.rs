//! Capacity Controller
//!
//! Seat admission and release on event occurrences, and the cancellation
//! cascade that closes an occurrence and returns everybody's money.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::payments::PaymentCoordinator;
use crate::domain::{
    CancellationRecord, CapacitySnapshot, DomainError, DomainResult, EventOccurrence,
    OccurrenceStatus, RefundOutcome, RepositoryProvider,
};

/// Result of cancelling an occurrence. Registrations whose money could not
/// be settled stay registered and are listed in `failed`.
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceCancellation {
    pub occurrence_id: Uuid,
    pub cancelled: Vec<(Uuid, RefundOutcome)>,
    pub failed: Vec<(Uuid, String)>,
}

impl OccurrenceCancellation {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CapacityController {
    repos: Arc<dyn RepositoryProvider>,
    payments: Arc<PaymentCoordinator>,
    protected_window: Duration,
}

impl CapacityController {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        payments: Arc<PaymentCoordinator>,
        protected_window: Duration,
    ) -> Self {
        Self {
            repos,
            payments,
            protected_window,
        }
    }

    async fn load(&self, occurrence_id: Uuid) -> DomainResult<EventOccurrence> {
        self.repos
            .occurrences()
            .find_by_id(occurrence_id)
            .await?
            .ok_or_else(|| DomainError::not_found("EventOccurrence", occurrence_id))
    }

    /// Take one seat. Fails with `CapacityExceeded` when the occurrence is
    /// full or no longer scheduled.
    pub async fn try_admit(&self, occurrence_id: Uuid) -> DomainResult<()> {
        if self.repos.occurrences().try_admit(occurrence_id).await? {
            return Ok(());
        }
        // Distinguish a missing occurrence from a full one.
        self.load(occurrence_id).await?;
        Err(DomainError::CapacityExceeded { occurrence_id })
    }

    pub async fn release(&self, occurrence_id: Uuid) -> DomainResult<()> {
        if !self.repos.occurrences().release(occurrence_id).await? {
            warn!(occurrence_id = %occurrence_id, "Seat release found no seat to give back");
        }
        Ok(())
    }

    pub async fn capacity(&self, occurrence_id: Uuid) -> DomainResult<CapacitySnapshot> {
        Ok(self.load(occurrence_id).await?.capacity())
    }

    /// Close the occurrence and cancel every active registration on it.
    ///
    /// Admissions are closed before any money moves. Re-running on an
    /// occurrence that was left partially cancelled retries the
    /// registrations that are still active, even inside the protected
    /// window.
    pub async fn cancel_occurrence(&self, occurrence_id: Uuid) -> DomainResult<OccurrenceCancellation> {
        let occurrence = self.load(occurrence_id).await?;
        let now = Utc::now();

        // A partially cancelled occurrence can always be resumed.
        let closing = occurrence.status == OccurrenceStatus::Scheduled;
        if closing
            && (occurrence.has_started(now) || occurrence.starts_within(now, self.protected_window))
        {
            return Err(DomainError::ProtectedWindow(format!(
                "occurrence {} starts at {} and can no longer be cancelled",
                occurrence_id,
                occurrence.start_time.to_rfc3339()
            )));
        }

        let registrations = self.repos.registrations();
        let flipped = self.repos.occurrences().mark_cancelled(occurrence_id).await?;
        let active = registrations.find_active_for_occurrence(occurrence_id).await?;

        if !flipped {
            if occurrence.status == OccurrenceStatus::Cancelled && active.is_empty() {
                return Err(DomainError::AlreadyCancelled {
                    entity: "EventOccurrence",
                    id: occurrence_id,
                });
            }
            info!(
                occurrence_id = %occurrence_id,
                remaining = active.len(),
                "Resuming occurrence cancellation"
            );
        }

        let mut records = Vec::with_capacity(active.len());
        let mut failed = Vec::new();
        for registration in &active {
            match self.payments.settle_for_cancellation(registration).await {
                Ok((outcome, payment_status)) => records.push(CancellationRecord {
                    registration_id: registration.id,
                    outcome,
                    payment_status,
                    cancelled_at: Utc::now(),
                }),
                Err(e) => {
                    warn!(
                        occurrence_id = %occurrence_id,
                        registration_id = %registration.id,
                        error = %e,
                        "Could not settle registration, leaving it registered"
                    );
                    failed.push((registration.id, e.to_string()));
                }
            }
        }

        let cancelled = registrations
            .cancel_for_occurrence(occurrence_id, records)
            .await?;
        let cancelled: Vec<(Uuid, RefundOutcome)> = cancelled
            .into_iter()
            .filter_map(|r| r.cancellation_outcome.map(|outcome| (r.id, outcome)))
            .collect();

        for (_, outcome) in &cancelled {
            metrics::counter!("registrations_cancelled_total", "outcome" => outcome.as_str())
                .increment(1);
        }
        if flipped {
            metrics::counter!("occurrences_cancelled_total").increment(1);
        }

        info!(
            occurrence_id = %occurrence_id,
            cancelled = cancelled.len(),
            failed = failed.len(),
            "🛑 Event occurrence cancelled"
        );

        Ok(OccurrenceCancellation {
            occurrence_id,
            cancelled,
            failed,
        })
    }
}
