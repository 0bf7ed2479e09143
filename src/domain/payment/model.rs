//! Payment state and money types shared by registrations and the processor port.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shared::errors::DomainError;

/// Payment status of a registration, mirroring the processor's view of the
/// authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    /// Funds are held and waiting to be captured.
    RequiresCapture,
    Processing,
    Succeeded,
    /// Authorization voided; no money moved.
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresCapture => "requires_capture",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "requires_payment_method" => Some(Self::RequiresPaymentMethod),
            "requires_capture" => Some(Self::RequiresCapture),
            "processing" => Some(Self::Processing),
            "succeeded" => Some(Self::Succeeded),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// A captured payment stays `Succeeded`; refunds are recorded as the
    /// cancellation outcome instead.
    pub fn can_become(&self, next: PaymentStatus) -> bool {
        *self != Self::Succeeded || next == Self::Succeeded
    }

    /// Map a raw processor status. Statuses that need the guardian to act
    /// again before funds are held collapse into `RequiresPaymentMethod`.
    pub fn from_processor(s: &str) -> Option<Self> {
        match s {
            "requires_confirmation" | "requires_action" => Some(Self::RequiresPaymentMethod),
            other => Self::from_str(other),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Amounts in minor currency units. `total = provider + platform_fee` holds
/// for every value of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentSplit {
    total_amount: i64,
    provider_amount: i64,
    platform_fee_amount: i64,
}

impl PaymentSplit {
    /// Returns `None` unless the parts are non-negative and add up to the total.
    pub fn checked(total_amount: i64, provider_amount: i64, platform_fee_amount: i64) -> Option<Self> {
        if total_amount < 0 || provider_amount < 0 || platform_fee_amount < 0 {
            return None;
        }
        if provider_amount.checked_add(platform_fee_amount)? != total_amount {
            return None;
        }
        Some(Self {
            total_amount,
            provider_amount,
            platform_fee_amount,
        })
    }

    pub fn total(&self) -> i64 {
        self.total_amount
    }

    pub fn provider(&self) -> i64 {
        self.provider_amount
    }

    pub fn platform_fee(&self) -> i64 {
        self.platform_fee_amount
    }
}

/// Platform fee as a percentage of the booking price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    percent: Decimal,
}

impl FeePolicy {
    pub fn new(percent: Decimal) -> Result<Self, DomainError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(DomainError::Validation(format!(
                "platform fee percent must be between 0 and 100, got {}",
                percent
            )));
        }
        Ok(Self { percent })
    }

    pub fn percent(&self) -> Decimal {
        self.percent
    }

    /// fee = floor(total * percent / 100), provider gets the rest.
    pub fn split(&self, total: i64) -> Result<PaymentSplit, DomainError> {
        if total < 0 {
            return Err(DomainError::Validation(format!(
                "amount must not be negative, got {}",
                total
            )));
        }

        let fee = (Decimal::from(total) * self.percent / Decimal::ONE_HUNDRED)
            .floor()
            .to_i64()
            .ok_or_else(|| DomainError::Internal(format!("fee overflow for amount {}", total)))?;

        PaymentSplit::checked(total, total - fee, fee)
            .ok_or_else(|| DomainError::Internal(format!("invalid fee split for amount {}", total)))
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            percent: Decimal::TEN,
        }
    }
}

/// What happened to the money when a registration was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundOutcome {
    /// Captured funds were refunded.
    #[serde(rename = "succeeded")]
    Refunded,
    /// The uncaptured authorization was voided.
    #[serde(rename = "cancelled")]
    Voided,
    #[serde(rename = "no_refund_needed")]
    NoRefundNeeded,
}

impl RefundOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refunded => "succeeded",
            Self::Voided => "cancelled",
            Self::NoRefundNeeded => "no_refund_needed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Refunded),
            "cancelled" => Some(Self::Voided),
            "no_refund_needed" => Some(Self::NoRefundNeeded),
            _ => None,
        }
    }
}

impl std::fmt::Display for RefundOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn ten_percent_fee_split() {
        let split = FeePolicy::default().split(10_000).unwrap();
        assert_eq!(split.total(), 10_000);
        assert_eq!(split.provider(), 9_000);
        assert_eq!(split.platform_fee(), 1_000);
    }

    #[test]
    fn fee_is_floored() {
        let split = FeePolicy::default().split(999).unwrap();
        assert_eq!(split.platform_fee(), 99);
        assert_eq!(split.provider(), 900);

        let policy = FeePolicy::new(Decimal::from_f64(12.5).unwrap()).unwrap();
        let split = policy.split(1_001).unwrap();
        assert_eq!(split.platform_fee(), 125);
        assert_eq!(split.provider() + split.platform_fee(), 1_001);
    }

    #[test]
    fn zero_and_full_fee_are_allowed() {
        let none = FeePolicy::new(Decimal::ZERO).unwrap().split(500).unwrap();
        assert_eq!((none.provider(), none.platform_fee()), (500, 0));

        let all = FeePolicy::new(Decimal::ONE_HUNDRED).unwrap().split(500).unwrap();
        assert_eq!((all.provider(), all.platform_fee()), (0, 500));
    }

    #[test]
    fn out_of_range_fee_is_rejected() {
        assert!(FeePolicy::new(Decimal::from(101)).is_err());
        assert!(FeePolicy::new(Decimal::from(-1)).is_err());
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(matches!(
            FeePolicy::default().split(-1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn checked_split_enforces_sum() {
        assert!(PaymentSplit::checked(100, 90, 10).is_some());
        assert!(PaymentSplit::checked(100, 90, 9).is_none());
        assert!(PaymentSplit::checked(100, 110, -10).is_none());
    }

    #[test]
    fn processor_statuses_map_onto_payment_status() {
        assert_eq!(
            PaymentStatus::from_processor("requires_capture"),
            Some(PaymentStatus::RequiresCapture)
        );
        assert_eq!(
            PaymentStatus::from_processor("requires_action"),
            Some(PaymentStatus::RequiresPaymentMethod)
        );
        assert_eq!(PaymentStatus::from_processor("bogus"), None);
    }

    #[test]
    fn refund_outcome_strings() {
        assert_eq!(RefundOutcome::Refunded.as_str(), "succeeded");
        assert_eq!(RefundOutcome::Voided.as_str(), "cancelled");
        assert_eq!(
            RefundOutcome::from_str("no_refund_needed"),
            Some(RefundOutcome::NoRefundNeeded)
        );
    }
}
