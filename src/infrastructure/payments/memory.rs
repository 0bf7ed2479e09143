//! In-memory payment processor for development and testing.
//!
//! Keeps a small intent state machine (`requires_capture -> succeeded`,
//! `requires_capture -> canceled`, `succeeded -> refunded`) and records
//! every call so tests can assert on which money actions happened.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::domain::payment::{
    IntentSnapshot, ManualCaptureRequest, PaymentProcessor, ProcessorResult, RefundReceipt,
};
use crate::shared::errors::ProcessorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorOperation {
    CreateIntent,
    Capture,
    Cancel,
    Refund,
    DetachPaymentMethod,
}

#[derive(Debug, Clone)]
struct StoredIntent {
    snapshot: IntentSnapshot,
    connected_account_id: String,
    refunded: bool,
}

pub struct InMemoryPaymentProcessor {
    intents: DashMap<String, StoredIntent>,
    attached_methods: DashMap<String, ()>,
    planned_failures: DashMap<ProcessorOperation, ProcessorError>,
    calls: Mutex<Vec<(ProcessorOperation, String)>>,
    initial_status: String,
    latency: Option<Duration>,
}

impl InMemoryPaymentProcessor {
    pub fn new() -> Self {
        Self {
            intents: DashMap::new(),
            attached_methods: DashMap::new(),
            planned_failures: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            initial_status: "requires_capture".to_string(),
            latency: None,
        }
    }

    /// Status new intents start in.
    pub fn with_initial_status(mut self, status: impl Into<String>) -> Self {
        self.initial_status = status.into();
        self
    }

    /// Delay applied before answering any call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: ProcessorOperation, error: ProcessorError) {
        self.planned_failures.insert(operation, error);
    }

    pub fn attach_payment_method(&self, payment_method_id: impl Into<String>) {
        self.attached_methods.insert(payment_method_id.into(), ());
    }

    pub fn calls(&self) -> Vec<(ProcessorOperation, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, operation: ProcessorOperation) -> usize {
        self.calls().iter().filter(|(op, _)| *op == operation).count()
    }

    pub fn intent(&self, intent_id: &str) -> Option<IntentSnapshot> {
        self.intents.get(intent_id).map(|i| i.snapshot.clone())
    }

    async fn begin(&self, operation: ProcessorOperation, subject: &str) -> ProcessorResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((operation, subject.to_string()));
        }
        match self.planned_failures.remove(&operation) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn unknown_intent(intent_id: &str) -> ProcessorError {
        ProcessorError::InvalidRequest(format!("No such payment_intent: '{}'", intent_id))
    }
}

impl Default for InMemoryPaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_manual_capture_intent(
        &self,
        request: &ManualCaptureRequest,
    ) -> ProcessorResult<IntentSnapshot> {
        self.begin(ProcessorOperation::CreateIntent, &request.payment_method_id)
            .await?;

        let id = format!("pi_mock_{}", Uuid::new_v4().simple());
        let snapshot = IntentSnapshot {
            id: id.clone(),
            client_secret: Some(format!("{}_secret_{}", id, Uuid::new_v4().simple())),
            status: self.initial_status.clone(),
            amount: request.amount,
            transfer_amount: Some(request.transfer_amount),
            application_fee_amount: Some(request.application_fee_amount),
            currency: request.currency.clone(),
        };
        self.intents.insert(
            id.clone(),
            StoredIntent {
                snapshot: snapshot.clone(),
                connected_account_id: request.payee_account_id.clone(),
                refunded: false,
            },
        );

        info!(intent_id = %id, amount = request.amount, "Mock authorization created");
        Ok(snapshot)
    }

    async fn capture_intent(
        &self,
        intent_id: &str,
        connected_account_id: &str,
    ) -> ProcessorResult<IntentSnapshot> {
        self.begin(ProcessorOperation::Capture, intent_id).await?;

        let mut intent = self
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| Self::unknown_intent(intent_id))?;
        if intent.connected_account_id != connected_account_id {
            return Err(Self::unknown_intent(intent_id));
        }
        if intent.snapshot.status != "requires_capture" {
            return Err(ProcessorError::InvalidRequest(format!(
                "PaymentIntent {} has status {} and cannot be captured",
                intent_id, intent.snapshot.status
            )));
        }
        intent.snapshot.status = "succeeded".to_string();
        Ok(intent.snapshot.clone())
    }

    async fn cancel_intent(
        &self,
        intent_id: &str,
        connected_account_id: &str,
    ) -> ProcessorResult<IntentSnapshot> {
        self.begin(ProcessorOperation::Cancel, intent_id).await?;

        let mut intent = self
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| Self::unknown_intent(intent_id))?;
        if intent.connected_account_id != connected_account_id {
            return Err(Self::unknown_intent(intent_id));
        }
        match intent.snapshot.status.as_str() {
            "requires_capture" | "requires_payment_method" | "requires_confirmation"
            | "requires_action" => {
                intent.snapshot.status = "canceled".to_string();
                Ok(intent.snapshot.clone())
            }
            other => Err(ProcessorError::InvalidRequest(format!(
                "PaymentIntent {} has status {} and cannot be canceled",
                intent_id, other
            ))),
        }
    }

    async fn refund_intent(
        &self,
        intent_id: &str,
        connected_account_id: &str,
    ) -> ProcessorResult<RefundReceipt> {
        self.begin(ProcessorOperation::Refund, intent_id).await?;

        let mut intent = self
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| Self::unknown_intent(intent_id))?;
        if intent.connected_account_id != connected_account_id {
            return Err(Self::unknown_intent(intent_id));
        }
        if intent.snapshot.status != "succeeded" || intent.refunded {
            return Err(ProcessorError::InvalidRequest(format!(
                "PaymentIntent {} has no captured charge to refund",
                intent_id
            )));
        }
        intent.refunded = true;

        Ok(RefundReceipt {
            id: format!("re_mock_{}", Uuid::new_v4().simple()),
            status: "succeeded".to_string(),
            amount: intent.snapshot.amount,
            currency: intent.snapshot.currency.clone(),
        })
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> ProcessorResult<()> {
        self.begin(ProcessorOperation::DetachPaymentMethod, payment_method_id)
            .await?;

        match self.attached_methods.remove(payment_method_id) {
            Some(_) => Ok(()),
            None => Err(ProcessorError::PaymentMethodNotAttached(
                payment_method_id.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request() -> ManualCaptureRequest {
        ManualCaptureRequest {
            amount: 10_000,
            currency: "thb".into(),
            payer_account_id: "cus_1".into(),
            payee_account_id: "acct_1".into(),
            payment_method_id: "pm_1".into(),
            application_fee_amount: 1_000,
            transfer_amount: 9_000,
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn capture_then_refund() {
        let processor = InMemoryPaymentProcessor::new();
        let intent = processor.create_manual_capture_intent(&request()).await.unwrap();
        assert_eq!(intent.status, "requires_capture");

        let captured = processor.capture_intent(&intent.id, "acct_1").await.unwrap();
        assert_eq!(captured.status, "succeeded");

        let refund = processor.refund_intent(&intent.id, "acct_1").await.unwrap();
        assert_eq!(refund.amount, 10_000);
        assert!(processor.refund_intent(&intent.id, "acct_1").await.is_err());
    }

    #[tokio::test]
    async fn captured_intent_cannot_be_voided() {
        let processor = InMemoryPaymentProcessor::new();
        let intent = processor.create_manual_capture_intent(&request()).await.unwrap();
        processor.capture_intent(&intent.id, "acct_1").await.unwrap();
        assert!(matches!(
            processor.cancel_intent(&intent.id, "acct_1").await,
            Err(ProcessorError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn planned_failure_hits_only_the_next_call() {
        let processor = InMemoryPaymentProcessor::new();
        processor.fail_next(ProcessorOperation::CreateIntent, ProcessorError::Timeout(10));
        assert!(processor.create_manual_capture_intent(&request()).await.is_err());
        assert!(processor.create_manual_capture_intent(&request()).await.is_ok());
        assert_eq!(processor.call_count(ProcessorOperation::CreateIntent), 2);
    }

    #[tokio::test]
    async fn detach_twice_reports_not_attached() {
        let processor = InMemoryPaymentProcessor::new();
        processor.attach_payment_method("pm_card");
        processor.detach_payment_method("pm_card").await.unwrap();
        assert_eq!(
            processor.detach_payment_method("pm_card").await,
            Err(ProcessorError::PaymentMethodNotAttached("pm_card".into()))
        );
    }
}
