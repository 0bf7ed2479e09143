//! Event occurrence HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::application::CapacityController;
use crate::interfaces::http::common::{error_response, ApiResponse, ApiResult};

use super::dto::*;

#[derive(Clone)]
pub struct OccurrenceAppState {
    pub capacity: Arc<CapacityController>,
}

#[utoipa::path(
    get,
    path = "/api/v1/event-occurrences/{id}/capacity",
    tag = "Event Occurrences",
    params(("id" = Uuid, Path, description = "Event occurrence ID")),
    responses(
        (status = 200, description = "Seat usage", body = ApiResponse<CapacityDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_capacity(
    State(state): State<OccurrenceAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CapacityDto> {
    let snapshot = state.capacity.capacity(id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(snapshot.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/event-occurrences/{id}/cancel",
    tag = "Event Occurrences",
    params(("id" = Uuid, Path, description = "Event occurrence ID")),
    responses(
        (status = 200, description = "Occurrence closed; per-registration outcomes", body = ApiResponse<OccurrenceCancellationDto>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already cancelled or inside the protected window")
    )
)]
pub async fn cancel_occurrence(
    State(state): State<OccurrenceAppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OccurrenceCancellationDto> {
    let result = state
        .capacity
        .cancel_occurrence(id)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(result.into())))
}
