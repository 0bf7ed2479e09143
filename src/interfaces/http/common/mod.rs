//! Response envelope and error mapping shared by every handler

mod validated_json;

pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::domain::{DomainError, ProcessorError};

/// Uniform API response wrapper
///
/// On success: `{"success": true, "data": {...}}`,
/// on failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub type ApiError<T> = (StatusCode, Json<ApiResponse<T>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError<T>>;

pub fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::CapacityExceeded { .. }
        | DomainError::AlreadyCancelled { .. }
        | DomainError::ProtectedWindow(_) => StatusCode::CONFLICT,
        DomainError::Processor(p) => match p {
            ProcessorError::PaymentMethodRequired => StatusCode::BAD_REQUEST,
            ProcessorError::Declined { .. } => StatusCode::PAYMENT_REQUIRED,
            ProcessorError::PaymentMethodNotAttached(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        },
        DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turn a domain failure into an HTTP error. Internal details stay in the
/// log; the client only sees a generic message.
pub fn error_response<T>(e: DomainError) -> ApiError<T> {
    let status = status_for(&e);
    let message = match status {
        StatusCode::INTERNAL_SERVER_ERROR => {
            error!(error = %e, "Request failed with internal error");
            "Internal server error".to_string()
        }
        StatusCode::BAD_GATEWAY => {
            warn!(error = %e, "Payment processor failure");
            e.to_string()
        }
        _ => e.to_string(),
    };
    (status, Json(ApiResponse::error(message)))
}

pub fn bad_request<T>(message: impl Into<String>) -> ApiError<T> {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}
