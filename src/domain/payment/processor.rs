//! Port to the external payment processor.
//!
//! Refund and void are separate calls: a refund returns captured money, a
//! void releases a hold that was never captured.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::shared::errors::ProcessorError;

pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Parameters for a manual-capture authorization with a connected-account split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualCaptureRequest {
    pub amount: i64,
    pub currency: String,
    /// Guardian's stored customer account.
    pub payer_account_id: String,
    /// Provider's connected account (funds destination).
    pub payee_account_id: String,
    pub payment_method_id: String,
    pub application_fee_amount: i64,
    pub transfer_amount: i64,
    pub metadata: BTreeMap<String, String>,
}

/// Processor view of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentSnapshot {
    pub id: String,
    pub client_secret: Option<String>,
    /// Raw processor status string.
    pub status: String,
    pub amount: i64,
    pub transfer_amount: Option<i64>,
    pub application_fee_amount: Option<i64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_manual_capture_intent(
        &self,
        request: &ManualCaptureRequest,
    ) -> ProcessorResult<IntentSnapshot>;

    async fn capture_intent(
        &self,
        intent_id: &str,
        connected_account_id: &str,
    ) -> ProcessorResult<IntentSnapshot>;

    /// Void an uncaptured authorization.
    async fn cancel_intent(
        &self,
        intent_id: &str,
        connected_account_id: &str,
    ) -> ProcessorResult<IntentSnapshot>;

    /// Refund a captured payment in full.
    async fn refund_intent(
        &self,
        intent_id: &str,
        connected_account_id: &str,
    ) -> ProcessorResult<RefundReceipt>;

    async fn detach_payment_method(&self, payment_method_id: &str) -> ProcessorResult<()>;
}
