//! Stripe REST client implementing the payment processor port.
//!
//! Authorizations are destination charges created with
//! `capture_method=manual`; the provider's connected account is passed as
//! `on_behalf_of` and `transfer_data[destination]`. The intent lives on the
//! platform account, so capture, cancel and refund are platform calls too.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::payment::{
    IntentSnapshot, ManualCaptureRequest, PaymentProcessor, ProcessorResult, RefundReceipt,
};
use crate::shared::errors::ProcessorError;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub api_base: String,
    pub request_timeout: Duration,
}

pub struct StripeProcessor {
    client: Client,
    settings: StripeSettings,
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
    currency: String,
    application_fee_amount: Option<i64>,
    transfer_data: Option<StripeTransferData>,
}

#[derive(Debug, Deserialize)]
struct StripeTransferData {
    amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    status: Option<String>,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    decline_code: Option<String>,
    message: Option<String>,
}

impl From<StripeIntent> for IntentSnapshot {
    fn from(intent: StripeIntent) -> Self {
        IntentSnapshot {
            id: intent.id,
            client_secret: intent.client_secret,
            status: intent.status,
            amount: intent.amount,
            transfer_amount: intent.transfer_data.and_then(|t| t.amount),
            application_fee_amount: intent.application_fee_amount,
            currency: intent.currency,
        }
    }
}

impl StripeProcessor {
    pub fn new(settings: StripeSettings) -> Result<Self, ProcessorError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;
        Ok(Self { client, settings })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> ProcessorResult<T> {
        let url = format!("{}{}", self.settings.api_base.trim_end_matches('/'), path);
        debug!(%url, "Calling payment processor");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.secret_key)
            .form(params)
            .send()
            .await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ProcessorError::Inconsistent(format!("unreadable response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_error(status, &body))
    }

    fn transport_error(&self, e: reqwest::Error) -> ProcessorError {
        if e.is_timeout() {
            ProcessorError::Timeout(self.settings.request_timeout.as_secs())
        } else {
            ProcessorError::Transport(e.to_string())
        }
    }
}

fn map_error(status: StatusCode, body: &str) -> ProcessorError {
    let parsed = serde_json::from_str::<StripeErrorEnvelope>(body).ok();
    let Some(StripeErrorEnvelope { error }) = parsed else {
        return ProcessorError::Upstream {
            status: status.as_u16(),
            message: "unexpected error response".to_string(),
        };
    };
    let message = error.message.unwrap_or_else(|| "no message".to_string());

    if status.is_server_error() {
        return ProcessorError::Upstream {
            status: status.as_u16(),
            message,
        };
    }

    match error.kind.as_deref() {
        Some("card_error") => ProcessorError::Declined {
            code: error.decline_code.or(error.code),
            message,
        },
        Some("invalid_request_error") if message.contains("not attached") => {
            ProcessorError::PaymentMethodNotAttached(message)
        }
        Some("invalid_request_error") => ProcessorError::InvalidRequest(message),
        _ if status == StatusCode::PAYMENT_REQUIRED => ProcessorError::Declined {
            code: error.code,
            message,
        },
        _ => {
            warn!(status = status.as_u16(), "Unexpected processor error type");
            ProcessorError::Upstream {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn intent_params(request: &ManualCaptureRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("amount".to_string(), request.amount.to_string()),
        ("currency".to_string(), request.currency.clone()),
        ("customer".to_string(), request.payer_account_id.clone()),
        ("payment_method".to_string(), request.payment_method_id.clone()),
        ("capture_method".to_string(), "manual".to_string()),
        ("confirm".to_string(), "true".to_string()),
        ("off_session".to_string(), "true".to_string()),
        ("on_behalf_of".to_string(), request.payee_account_id.clone()),
        (
            "application_fee_amount".to_string(),
            request.application_fee_amount.to_string(),
        ),
        (
            "transfer_data[destination]".to_string(),
            request.payee_account_id.clone(),
        ),
        (
            "transfer_data[amount]".to_string(),
            request.transfer_amount.to_string(),
        ),
    ];
    params.extend(
        request
            .metadata
            .iter()
            .map(|(k, v)| (format!("metadata[{}]", k), v.clone())),
    );
    params
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_manual_capture_intent(
        &self,
        request: &ManualCaptureRequest,
    ) -> ProcessorResult<IntentSnapshot> {
        let intent: StripeIntent = self
            .post("/v1/payment_intents", &intent_params(request))
            .await?;
        Ok(intent.into())
    }

    async fn capture_intent(
        &self,
        intent_id: &str,
        _connected_account_id: &str,
    ) -> ProcessorResult<IntentSnapshot> {
        let intent: StripeIntent = self
            .post(
                &format!("/v1/payment_intents/{}/capture", intent_id),
                &[],
            )
            .await?;
        Ok(intent.into())
    }

    async fn cancel_intent(
        &self,
        intent_id: &str,
        _connected_account_id: &str,
    ) -> ProcessorResult<IntentSnapshot> {
        let intent: StripeIntent = self
            .post(
                &format!("/v1/payment_intents/{}/cancel", intent_id),
                &[],
            )
            .await?;
        Ok(intent.into())
    }

    async fn refund_intent(
        &self,
        intent_id: &str,
        _connected_account_id: &str,
    ) -> ProcessorResult<RefundReceipt> {
        let refund: StripeRefund = self
            .post(
                "/v1/refunds",
                &[("payment_intent".to_string(), intent_id.to_string())],
            )
            .await?;
        Ok(RefundReceipt {
            id: refund.id,
            status: refund.status.unwrap_or_else(|| "pending".to_string()),
            amount: refund.amount,
            currency: refund.currency,
        })
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> ProcessorResult<()> {
        let _: serde_json::Value = self
            .post(
                &format!("/v1/payment_methods/{}/detach", payment_method_id),
                &[],
            )
            .await?;
        Ok(())
    }
}
