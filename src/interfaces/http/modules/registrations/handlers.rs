//! Registration HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::application::{CreateRegistration, RegistrationService};
use crate::domain::PaymentStatus;
use crate::interfaces::http::common::{
    bad_request, error_response, ApiError, ApiResponse, ApiResult, ValidatedJson,
};

use super::dto::*;

#[derive(Clone)]
pub struct RegistrationAppState {
    pub registrations: Arc<RegistrationService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/registrations",
    tag = "Registrations",
    request_body = CreateRegistrationRequest,
    responses(
        (status = 201, description = "Seat taken and payment authorized", body = ApiResponse<CreateRegistrationResponse>),
        (status = 400, description = "Invalid references or missing payment method"),
        (status = 402, description = "Card declined"),
        (status = 409, description = "Occurrence is full"),
        (status = 502, description = "Payment processor unavailable")
    )
)]
pub async fn create_registration(
    State(state): State<RegistrationAppState>,
    ValidatedJson(request): ValidatedJson<CreateRegistrationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateRegistrationResponse>>), ApiError<CreateRegistrationResponse>>
{
    let created = state
        .registrations
        .create(CreateRegistration {
            child_id: request.child_id,
            guardian_id: request.guardian_id,
            event_occurrence_id: request.event_occurrence_id,
            payment_method_id: request.payment_method_id,
        })
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/registrations/{id}",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Registration", body = ApiResponse<RegistrationDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_registration(
    State(state): State<RegistrationAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RegistrationDto> {
    let registration = state.registrations.get(id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(registration.into())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/registrations/{id}",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration ID")),
    request_body = UpdateRegistrationRequest,
    responses(
        (status = 200, description = "Registration updated", body = ApiResponse<RegistrationDto>),
        (status = 400, description = "Child unknown or belongs to another guardian"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Registration is cancelled")
    )
)]
pub async fn update_registration(
    State(state): State<RegistrationAppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateRegistrationRequest>,
) -> ApiResult<RegistrationDto> {
    let registration = state
        .registrations
        .update_child(id, request.child_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(registration.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/registrations/{id}",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Registration deleted, seat released if it was held", body = ApiResponse<RegistrationDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_registration(
    State(state): State<RegistrationAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RegistrationDto> {
    let removed = state.registrations.delete(id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(removed.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/cancel",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Cancelled; money refunded or released", body = ApiResponse<CancelRegistrationResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already cancelled"),
        (status = 502, description = "Refund or void failed, registration unchanged")
    )
)]
pub async fn cancel_registration(
    State(state): State<RegistrationAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CancelRegistrationResponse> {
    let result = state.registrations.cancel(id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(result.into())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/registrations/{id}/payment-status",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration ID")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status recorded", body = ApiResponse<RegistrationDto>),
        (status = 400, description = "Unknown payment status, or the registration is already paid"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_payment_status(
    State(state): State<RegistrationAppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdatePaymentStatusRequest>,
) -> ApiResult<RegistrationDto> {
    let Some(status) = PaymentStatus::from_str(&request.payment_status) else {
        return Err(bad_request(format!(
            "Unknown payment status '{}'",
            request.payment_status
        )));
    };

    let registration = state
        .registrations
        .update_payment_status(id, status)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(registration.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/registrations/child/{child_id}",
    tag = "Registrations",
    params(("child_id" = Uuid, Path, description = "Child ID")),
    responses((status = 200, description = "Registrations of the child, newest first", body = ApiResponse<Vec<RegistrationDto>>))
)]
pub async fn list_by_child(
    State(state): State<RegistrationAppState>,
    Path(child_id): Path<Uuid>,
) -> ApiResult<Vec<RegistrationDto>> {
    let list = state
        .registrations
        .list_by_child(child_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(
        list.into_iter().map(RegistrationDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/registrations/guardian/{guardian_id}",
    tag = "Registrations",
    params(("guardian_id" = Uuid, Path, description = "Guardian ID")),
    responses((status = 200, description = "Registrations made by the guardian, newest first", body = ApiResponse<Vec<RegistrationDto>>))
)]
pub async fn list_by_guardian(
    State(state): State<RegistrationAppState>,
    Path(guardian_id): Path<Uuid>,
) -> ApiResult<Vec<RegistrationDto>> {
    let list = state
        .registrations
        .list_by_guardian(guardian_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(
        list.into_iter().map(RegistrationDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/registrations/event-occurrence/{occurrence_id}",
    tag = "Registrations",
    params(("occurrence_id" = Uuid, Path, description = "Event occurrence ID")),
    responses((status = 200, description = "Registrations for the occurrence, newest first", body = ApiResponse<Vec<RegistrationDto>>))
)]
pub async fn list_by_occurrence(
    State(state): State<RegistrationAppState>,
    Path(occurrence_id): Path<Uuid>,
) -> ApiResult<Vec<RegistrationDto>> {
    let list = state
        .registrations
        .list_by_occurrence(occurrence_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(
        list.into_iter().map(RegistrationDto::from).collect(),
    )))
}
