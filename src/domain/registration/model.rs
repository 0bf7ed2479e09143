//! Registration domain entity

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::payment::{PaymentSplit, PaymentStatus, RefundOutcome};
use crate::shared::errors::DomainError;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    /// Holds a seat on the occurrence
    Registered,
    /// Terminal
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "registered" => Some(Self::Registered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One booking of a child onto an event occurrence, with its payment state.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub id: Uuid,
    /// `None` once the child record has been removed.
    pub child_id: Option<Uuid>,
    /// `None` once the guardian record has been removed.
    pub guardian_id: Option<Uuid>,
    pub event_occurrence_id: Uuid,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub split: PaymentSplit,
    pub currency: String,
    /// Processor payment intent id
    pub authorization_id: String,
    pub payer_account_id: String,
    pub payee_account_id: String,
    pub payment_method_id: Option<String>,
    pub event_name: String,
    pub occurrence_start_time: DateTime<Utc>,
    pub reminder_sent: bool,
    pub cancellation_outcome: Option<RefundOutcome>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything known about a booking once its authorization exists.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub child_id: Uuid,
    pub guardian_id: Uuid,
    pub event_occurrence_id: Uuid,
    pub payment_status: PaymentStatus,
    pub split: PaymentSplit,
    pub currency: String,
    pub authorization_id: String,
    pub payer_account_id: String,
    pub payee_account_id: String,
    pub payment_method_id: Option<String>,
    pub event_name: String,
    pub occurrence_start_time: DateTime<Utc>,
}

impl Registration {
    pub fn new(new: NewRegistration) -> Self {
        let now = Utc::now();
        let paid_at = (new.payment_status == PaymentStatus::Succeeded).then_some(now);
        Self {
            id: Uuid::new_v4(),
            child_id: Some(new.child_id),
            guardian_id: Some(new.guardian_id),
            event_occurrence_id: new.event_occurrence_id,
            status: BookingStatus::Registered,
            payment_status: new.payment_status,
            split: new.split,
            currency: new.currency,
            authorization_id: new.authorization_id,
            payer_account_id: new.payer_account_id,
            payee_account_id: new.payee_account_id,
            payment_method_id: new.payment_method_id,
            event_name: new.event_name,
            occurrence_start_time: new.occurrence_start_time,
            reminder_sent: false,
            cancellation_outcome: None,
            paid_at,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Registered
    }

    /// Set the payment status. `paid_at` is stamped on the first transition
    /// into `Succeeded` and never overwritten; a succeeded payment cannot
    /// move to any other status.
    pub fn apply_payment_status(
        &mut self,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.payment_status.can_become(status) {
            return Err(payment_status_locked(self.id, status));
        }
        if status == PaymentStatus::Succeeded && self.paid_at.is_none() {
            self.paid_at = Some(at);
        }
        self.payment_status = status;
        self.updated_at = at;
        Ok(())
    }

    /// Apply a cancellation after the money side has been settled.
    pub fn cancel(&mut self, record: &CancellationRecord) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::AlreadyCancelled {
                entity: "Registration",
                id: self.id,
            });
        }
        if let Some(status) = record.payment_status {
            self.apply_payment_status(status, record.cancelled_at)?;
        }
        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(record.cancelled_at);
        self.cancellation_outcome = Some(record.outcome);
        self.updated_at = record.cancelled_at;
        Ok(())
    }
}

/// Error for an attempt to move a paid registration off `Succeeded`.
pub fn payment_status_locked(id: Uuid, status: PaymentStatus) -> DomainError {
    DomainError::Validation(format!(
        "registration {} is paid; payment status cannot change to {}",
        id, status
    ))
}

/// Result of settling a registration's money before it is marked cancelled.
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationRecord {
    pub registration_id: Uuid,
    pub outcome: RefundOutcome,
    /// New payment status reported by the processor, if it changed.
    pub payment_status: Option<PaymentStatus>,
    pub cancelled_at: DateTime<Utc>,
}

/// A registration due for a reminder, joined with guardian contact details.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderTarget {
    pub registration_id: Uuid,
    pub guardian_id: Option<Uuid>,
    pub guardian_name: Option<String>,
    pub guardian_email: Option<String>,
    pub event_name: String,
    pub occurrence_start_time: DateTime<Utc>,
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_registration(status: PaymentStatus) -> Registration {
        Registration::new(NewRegistration {
            child_id: Uuid::new_v4(),
            guardian_id: Uuid::new_v4(),
            event_occurrence_id: Uuid::new_v4(),
            payment_status: status,
            split: PaymentSplit::checked(10_000, 9_000, 1_000).unwrap(),
            currency: "thb".into(),
            authorization_id: "pi_123".into(),
            payer_account_id: "cus_1".into(),
            payee_account_id: "acct_1".into(),
            payment_method_id: Some("pm_1".into()),
            event_name: "Robotics Club".into(),
            occurrence_start_time: Utc::now() + Duration::days(3),
        })
    }

    #[test]
    fn new_registration_is_active_and_unpaid() {
        let r = sample_registration(PaymentStatus::RequiresCapture);
        assert!(r.is_active());
        assert!(r.paid_at.is_none());
        assert!(r.cancelled_at.is_none());
        assert!(!r.reminder_sent);
    }

    #[test]
    fn paid_at_is_set_once_on_success() {
        let mut r = sample_registration(PaymentStatus::RequiresCapture);
        let first = Utc::now();
        r.apply_payment_status(PaymentStatus::Succeeded, first).unwrap();
        assert_eq!(r.paid_at, Some(first));

        r.apply_payment_status(PaymentStatus::Succeeded, first + Duration::hours(1))
            .unwrap();
        assert_eq!(r.paid_at, Some(first));
    }

    #[test]
    fn succeeded_payment_cannot_move_to_another_status() {
        let mut r = sample_registration(PaymentStatus::RequiresCapture);
        r.apply_payment_status(PaymentStatus::Succeeded, Utc::now()).unwrap();

        for next in [
            PaymentStatus::Processing,
            PaymentStatus::RequiresCapture,
            PaymentStatus::Canceled,
        ] {
            assert!(matches!(
                r.apply_payment_status(next, Utc::now()),
                Err(DomainError::Validation(_))
            ));
        }
        assert_eq!(r.payment_status, PaymentStatus::Succeeded);
        assert!(r.paid_at.is_some());
    }

    #[test]
    fn non_success_status_leaves_paid_at_empty() {
        let mut r = sample_registration(PaymentStatus::RequiresCapture);
        r.apply_payment_status(PaymentStatus::Processing, Utc::now()).unwrap();
        assert!(r.paid_at.is_none());
        assert_eq!(r.payment_status, PaymentStatus::Processing);
    }

    #[test]
    fn cancel_records_outcome_and_time() {
        let mut r = sample_registration(PaymentStatus::RequiresCapture);
        let at = Utc::now();
        r.cancel(&CancellationRecord {
            registration_id: r.id,
            outcome: RefundOutcome::Voided,
            payment_status: Some(PaymentStatus::Canceled),
            cancelled_at: at,
        })
        .unwrap();

        assert_eq!(r.status, BookingStatus::Cancelled);
        assert_eq!(r.cancelled_at, Some(at));
        assert_eq!(r.cancellation_outcome, Some(RefundOutcome::Voided));
        assert_eq!(r.payment_status, PaymentStatus::Canceled);
    }

    #[test]
    fn second_cancel_is_rejected() {
        let mut r = sample_registration(PaymentStatus::Succeeded);
        let record = CancellationRecord {
            registration_id: r.id,
            outcome: RefundOutcome::Refunded,
            payment_status: None,
            cancelled_at: Utc::now(),
        };
        r.cancel(&record).unwrap();
        assert!(matches!(
            r.cancel(&record),
            Err(DomainError::AlreadyCancelled { .. })
        ));
    }

    #[test]
    fn booking_status_round_trips_through_strings() {
        assert_eq!(BookingStatus::from_str("registered"), Some(BookingStatus::Registered));
        assert_eq!(BookingStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(BookingStatus::from_str("unknown"), None);
    }
}
