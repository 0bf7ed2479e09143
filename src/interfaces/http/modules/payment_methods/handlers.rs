//! Payment method HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::PaymentCoordinator;
use crate::interfaces::http::common::{bad_request, error_response, ApiResponse, ApiResult};

#[derive(Clone)]
pub struct PaymentMethodAppState {
    pub payments: Arc<PaymentCoordinator>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetachPaymentMethodResponse {
    pub payment_method_id: String,
    pub detached: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/payment-methods/{payment_method_id}/detach",
    tag = "Payment Methods",
    params(("payment_method_id" = String, Path, description = "Processor payment method ID")),
    responses(
        (status = 200, description = "Payment method detached", body = ApiResponse<DetachPaymentMethodResponse>),
        (status = 404, description = "Payment method is not attached to a customer"),
        (status = 502, description = "Payment processor unavailable")
    )
)]
pub async fn detach_payment_method(
    State(state): State<PaymentMethodAppState>,
    Path(payment_method_id): Path<String>,
) -> ApiResult<DetachPaymentMethodResponse> {
    if payment_method_id.trim().is_empty() {
        return Err(bad_request("payment_method_id must not be empty"));
    }

    state
        .payments
        .detach_payment_method(&payment_method_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(DetachPaymentMethodResponse {
        payment_method_id,
        detached: true,
    })))
}
