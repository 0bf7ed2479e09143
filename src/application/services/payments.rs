//! Payment Authorization Coordinator
//!
//! Wraps the processor port with the platform fee policy and a hard
//! per-call timeout. Everything money-related the rest of the service does
//! goes through here.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::payment::{IntentSnapshot, ManualCaptureRequest, ProcessorResult};
use crate::domain::{
    DomainResult, FeePolicy, PaymentProcessor, PaymentSplit, PaymentStatus, ProcessorError,
    RefundOutcome, Registration,
};

/// What a booking needs authorized.
#[derive(Debug, Clone)]
pub struct AuthorizationParams {
    pub amount: i64,
    pub currency: String,
    pub payer_account_id: String,
    pub payee_account_id: String,
    pub payment_method_id: Option<String>,
    pub event_occurrence_id: Uuid,
    pub event_date: DateTime<Utc>,
}

/// A manual-capture authorization as created by the processor.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorization {
    pub authorization_id: String,
    pub client_secret: Option<String>,
    pub status: PaymentStatus,
    pub split: PaymentSplit,
    pub currency: String,
}

pub struct PaymentCoordinator {
    processor: Arc<dyn PaymentProcessor>,
    fee_policy: FeePolicy,
    timeout: Duration,
}

impl PaymentCoordinator {
    pub fn new(processor: Arc<dyn PaymentProcessor>, fee_policy: FeePolicy, timeout: Duration) -> Self {
        Self {
            processor,
            fee_policy,
            timeout,
        }
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.fee_policy
    }

    async fn call<T, F>(&self, operation: &'static str, call: F) -> ProcessorResult<T>
    where
        F: Future<Output = ProcessorResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_secs = self.timeout.as_secs(),
                    "⏱️ Processor call timed out, outcome unknown"
                );
                Err(ProcessorError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    /// Authorize (but do not capture) the booking amount, split between the
    /// provider's connected account and the platform fee.
    pub async fn create_authorization(&self, params: AuthorizationParams) -> DomainResult<Authorization> {
        let payment_method_id = params
            .payment_method_id
            .as_deref()
            .map(str::trim)
            .filter(|pm| !pm.is_empty())
            .ok_or(ProcessorError::PaymentMethodRequired)?;

        let split = self.fee_policy.split(params.amount)?;

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "event_date".to_string(),
            params.event_date.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        metadata.insert(
            "event_occurrence_id".to_string(),
            params.event_occurrence_id.to_string(),
        );

        let request = ManualCaptureRequest {
            amount: split.total(),
            currency: params.currency.clone(),
            payer_account_id: params.payer_account_id,
            payee_account_id: params.payee_account_id,
            payment_method_id: payment_method_id.to_string(),
            application_fee_amount: split.platform_fee(),
            transfer_amount: split.provider(),
            metadata,
        };

        let intent = self
            .call(
                "create_manual_capture_intent",
                self.processor.create_manual_capture_intent(&request),
            )
            .await?;

        let checked = map_status(&intent)
            .and_then(|status| realized_split(&intent, split).map(|realized| (status, realized)));
        let (status, realized) = match checked {
            Ok(checked) => checked,
            Err(e) => {
                self.abandon(&intent.id, &request.payee_account_id).await;
                return Err(e.into());
            }
        };

        info!(
            authorization_id = %intent.id,
            amount = realized.total(),
            platform_fee = realized.platform_fee(),
            status = %status,
            "💳 Authorization created"
        );

        Ok(Authorization {
            authorization_id: intent.id,
            client_secret: intent.client_secret,
            status,
            split: realized,
            currency: if intent.currency.is_empty() {
                params.currency
            } else {
                intent.currency
            },
        })
    }

    /// Void an authorization whose processor response cannot be used, so the
    /// guardian's funds are not left on hold.
    async fn abandon(&self, authorization_id: &str, payee_account_id: &str) {
        match self
            .call(
                "cancel_intent",
                self.processor.cancel_intent(authorization_id, payee_account_id),
            )
            .await
        {
            Ok(_) => warn!(
                authorization_id = %authorization_id,
                "Voided authorization with an unusable processor response"
            ),
            Err(e) => error!(
                authorization_id = %authorization_id,
                error = %e,
                "🚨 Could not void authorization with an unusable processor response"
            ),
        }
    }

    /// Capture a held authorization. Returns the processor's resulting status.
    pub async fn capture(&self, authorization_id: &str, payee_account_id: &str) -> DomainResult<PaymentStatus> {
        let intent = self
            .call(
                "capture_intent",
                self.processor.capture_intent(authorization_id, payee_account_id),
            )
            .await?;
        Ok(map_status(&intent)?)
    }

    /// Release an uncaptured authorization.
    pub async fn void(&self, authorization_id: &str, payee_account_id: &str) -> DomainResult<PaymentStatus> {
        let intent = self
            .call(
                "cancel_intent",
                self.processor.cancel_intent(authorization_id, payee_account_id),
            )
            .await?;
        Ok(PaymentStatus::from_processor(&intent.status).unwrap_or(PaymentStatus::Canceled))
    }

    /// Refund a captured payment in full. Returns the refunded amount.
    pub async fn refund(&self, authorization_id: &str, payee_account_id: &str) -> DomainResult<i64> {
        let receipt = self
            .call(
                "refund_intent",
                self.processor.refund_intent(authorization_id, payee_account_id),
            )
            .await?;
        debug!(refund_id = %receipt.id, status = %receipt.status, "Refund issued");
        Ok(receipt.amount)
    }

    /// Undo the money side of a booking: refund when captured, void when
    /// only authorized, nothing otherwise. The returned status is the
    /// registration's new payment status when it changed.
    pub async fn settle_for_cancellation(
        &self,
        registration: &Registration,
    ) -> DomainResult<(RefundOutcome, Option<PaymentStatus>)> {
        match registration.payment_status {
            PaymentStatus::Succeeded => {
                let amount = self
                    .refund(&registration.authorization_id, &registration.payee_account_id)
                    .await?;
                info!(
                    registration_id = %registration.id,
                    amount,
                    currency = %registration.currency,
                    "💸 Payment refunded"
                );
                Ok((RefundOutcome::Refunded, None))
            }
            PaymentStatus::RequiresCapture => {
                let status = self
                    .void(&registration.authorization_id, &registration.payee_account_id)
                    .await?;
                info!(registration_id = %registration.id, "Authorization voided");
                Ok((RefundOutcome::Voided, Some(status)))
            }
            other => {
                debug!(
                    registration_id = %registration.id,
                    payment_status = %other,
                    "No money to return"
                );
                Ok((RefundOutcome::NoRefundNeeded, None))
            }
        }
    }

    pub async fn detach_payment_method(&self, payment_method_id: &str) -> DomainResult<()> {
        self.call(
            "detach_payment_method",
            self.processor.detach_payment_method(payment_method_id),
        )
        .await?;
        info!(payment_method_id, "Payment method detached");
        Ok(())
    }
}

fn map_status(intent: &IntentSnapshot) -> ProcessorResult<PaymentStatus> {
    PaymentStatus::from_processor(&intent.status).ok_or_else(|| {
        ProcessorError::Inconsistent(format!(
            "intent {} reported unknown status {}",
            intent.id, intent.status
        ))
    })
}

/// Amounts the processor actually booked, falling back to what was asked
/// for where it did not say.
fn realized_split(intent: &IntentSnapshot, requested: PaymentSplit) -> ProcessorResult<PaymentSplit> {
    let fee = intent.application_fee_amount.unwrap_or(requested.platform_fee());
    let provider = intent.transfer_amount.unwrap_or(requested.provider());
    PaymentSplit::checked(intent.amount, provider, fee).ok_or_else(|| {
        ProcessorError::Inconsistent(format!(
            "intent {} amount {} does not equal transfer {} plus fee {}",
            intent.id, intent.amount, provider, fee
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::RefundReceipt;
    use crate::domain::{DomainError, NewRegistration};
    use crate::infrastructure::{InMemoryPaymentProcessor, ProcessorOperation};
    use async_trait::async_trait;

    fn params(payment_method_id: Option<&str>) -> AuthorizationParams {
        AuthorizationParams {
            amount: 10_000,
            currency: "thb".into(),
            payer_account_id: "cus_1".into(),
            payee_account_id: "acct_1".into(),
            payment_method_id: payment_method_id.map(String::from),
            event_occurrence_id: Uuid::new_v4(),
            event_date: Utc::now() + chrono::Duration::days(3),
        }
    }

    fn coordinator(processor: Arc<InMemoryPaymentProcessor>) -> PaymentCoordinator {
        PaymentCoordinator::new(processor, FeePolicy::default(), Duration::from_secs(2))
    }

    fn registration(authorization_id: &str, status: PaymentStatus) -> Registration {
        Registration::new(NewRegistration {
            child_id: Uuid::new_v4(),
            guardian_id: Uuid::new_v4(),
            event_occurrence_id: Uuid::new_v4(),
            payment_status: status,
            split: PaymentSplit::checked(10_000, 9_000, 1_000).unwrap(),
            currency: "thb".into(),
            authorization_id: authorization_id.into(),
            payer_account_id: "cus_1".into(),
            payee_account_id: "acct_1".into(),
            payment_method_id: Some("pm_1".into()),
            event_name: "Chess".into(),
            occurrence_start_time: Utc::now() + chrono::Duration::days(3),
        })
    }

    #[tokio::test]
    async fn authorization_carries_ten_percent_fee_split() {
        let processor = Arc::new(InMemoryPaymentProcessor::new());
        let auth = coordinator(processor.clone())
            .create_authorization(params(Some("pm_card")))
            .await
            .unwrap();

        assert_eq!(auth.status, PaymentStatus::RequiresCapture);
        assert_eq!(auth.split.total(), 10_000);
        assert_eq!(auth.split.provider(), 9_000);
        assert_eq!(auth.split.platform_fee(), 1_000);
        assert!(auth.client_secret.is_some());

        let intent = processor.intent(&auth.authorization_id).unwrap();
        assert_eq!(intent.application_fee_amount, Some(1_000));
        assert_eq!(intent.transfer_amount, Some(9_000));
    }

    #[tokio::test]
    async fn missing_payment_method_fails_before_calling_processor() {
        let processor = Arc::new(InMemoryPaymentProcessor::new());
        let coordinator = coordinator(processor.clone());

        for pm in [None, Some("   ")] {
            let err = coordinator.create_authorization(params(pm)).await.unwrap_err();
            assert!(matches!(
                err,
                DomainError::Processor(ProcessorError::PaymentMethodRequired)
            ));
        }
        assert!(processor.calls().is_empty());
    }

    #[tokio::test]
    async fn requires_action_maps_to_requires_payment_method() {
        let processor = Arc::new(InMemoryPaymentProcessor::new().with_initial_status("requires_action"));
        let auth = coordinator(processor)
            .create_authorization(params(Some("pm_card")))
            .await
            .unwrap();
        assert_eq!(auth.status, PaymentStatus::RequiresPaymentMethod);
    }

    #[tokio::test]
    async fn slow_processor_times_out() {
        let processor = Arc::new(InMemoryPaymentProcessor::new().with_latency(Duration::from_millis(200)));
        let coordinator = PaymentCoordinator::new(processor, FeePolicy::default(), Duration::from_millis(20));
        let err = coordinator
            .create_authorization(params(Some("pm_card")))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Processor(ProcessorError::Timeout(_))));
    }

    #[tokio::test]
    async fn settlement_refunds_captured_and_voids_held_payments() {
        let processor = Arc::new(InMemoryPaymentProcessor::new());
        let coordinator = coordinator(processor.clone());

        let held = coordinator.create_authorization(params(Some("pm_a"))).await.unwrap();
        let captured = coordinator.create_authorization(params(Some("pm_b"))).await.unwrap();
        coordinator.capture(&captured.authorization_id, "acct_1").await.unwrap();

        let (outcome, status) = coordinator
            .settle_for_cancellation(&registration(&held.authorization_id, PaymentStatus::RequiresCapture))
            .await
            .unwrap();
        assert_eq!(outcome, RefundOutcome::Voided);
        assert_eq!(status, Some(PaymentStatus::Canceled));

        let (outcome, status) = coordinator
            .settle_for_cancellation(&registration(&captured.authorization_id, PaymentStatus::Succeeded))
            .await
            .unwrap();
        assert_eq!(outcome, RefundOutcome::Refunded);
        assert_eq!(status, None);

        let (outcome, _) = coordinator
            .settle_for_cancellation(&registration("pi_none", PaymentStatus::RequiresPaymentMethod))
            .await
            .unwrap();
        assert_eq!(outcome, RefundOutcome::NoRefundNeeded);

        assert_eq!(processor.call_count(ProcessorOperation::Refund), 1);
        assert_eq!(processor.call_count(ProcessorOperation::Cancel), 1);
    }

    /// Books a transfer one unit larger than requested and records voids.
    #[derive(Default)]
    struct SkewedProcessor {
        voided: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PaymentProcessor for SkewedProcessor {
        async fn create_manual_capture_intent(
            &self,
            request: &ManualCaptureRequest,
        ) -> ProcessorResult<IntentSnapshot> {
            Ok(IntentSnapshot {
                id: "pi_skewed".into(),
                client_secret: None,
                status: "requires_capture".into(),
                amount: request.amount,
                transfer_amount: Some(request.transfer_amount + 1),
                application_fee_amount: None,
                currency: request.currency.clone(),
            })
        }

        async fn capture_intent(&self, _: &str, _: &str) -> ProcessorResult<IntentSnapshot> {
            Err(ProcessorError::InvalidRequest("unsupported".into()))
        }

        async fn cancel_intent(&self, id: &str, _: &str) -> ProcessorResult<IntentSnapshot> {
            self.voided.lock().unwrap().push(id.to_string());
            Ok(IntentSnapshot {
                id: id.to_string(),
                client_secret: None,
                status: "canceled".into(),
                amount: 10_000,
                transfer_amount: None,
                application_fee_amount: None,
                currency: "thb".into(),
            })
        }

        async fn refund_intent(&self, _: &str, _: &str) -> ProcessorResult<RefundReceipt> {
            Err(ProcessorError::InvalidRequest("unsupported".into()))
        }

        async fn detach_payment_method(&self, _: &str) -> ProcessorResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn realized_amounts_breaking_the_split_are_rejected() {
        let processor = Arc::new(SkewedProcessor::default());
        let coordinator =
            PaymentCoordinator::new(processor.clone(), FeePolicy::default(), Duration::from_secs(1));
        let err = coordinator
            .create_authorization(params(Some("pm_card")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Processor(ProcessorError::Inconsistent(_))
        ));
        assert_eq!(*processor.voided.lock().unwrap(), vec!["pi_skewed".to_string()]);
    }

    #[tokio::test]
    async fn detach_of_unattached_method_is_reported() {
        let processor = Arc::new(InMemoryPaymentProcessor::new());
        let err = coordinator(processor)
            .detach_payment_method("pm_unknown")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Processor(ProcessorError::PaymentMethodNotAttached(_))
        ));
    }
}
