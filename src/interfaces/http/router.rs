//! API router with Swagger UI

use std::sync::Arc;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{CapacityController, PaymentCoordinator, RegistrationService};

use super::common::ApiResponse;
use super::modules::health::{self, HealthState};
use super::modules::metrics::{self, http_metrics_middleware, MetricsState};
use super::modules::occurrences::{self, OccurrenceAppState};
use super::modules::payment_methods::{self, PaymentMethodAppState};
use super::modules::registrations::{self, RegistrationAppState};
use super::modules::request_id::request_id_middleware;

/// Services behind the `/api/v1` routes. Each handler module extracts its
/// own slice via `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub registrations: Arc<RegistrationService>,
    pub capacity: Arc<CapacityController>,
    pub payments: Arc<PaymentCoordinator>,
}

impl FromRef<ApiState> for RegistrationAppState {
    fn from_ref(s: &ApiState) -> Self {
        RegistrationAppState {
            registrations: Arc::clone(&s.registrations),
        }
    }
}

impl FromRef<ApiState> for OccurrenceAppState {
    fn from_ref(s: &ApiState) -> Self {
        OccurrenceAppState {
            capacity: Arc::clone(&s.capacity),
        }
    }
}

impl FromRef<ApiState> for PaymentMethodAppState {
    fn from_ref(s: &ApiState) -> Self {
        PaymentMethodAppState {
            payments: Arc::clone(&s.payments),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        registrations::create_registration,
        registrations::get_registration,
        registrations::update_registration,
        registrations::delete_registration,
        registrations::cancel_registration,
        registrations::update_payment_status,
        registrations::list_by_child,
        registrations::list_by_guardian,
        registrations::list_by_occurrence,
        occurrences::get_capacity,
        occurrences::cancel_occurrence,
        payment_methods::detach_payment_method,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            registrations::CreateRegistrationRequest,
            registrations::UpdateRegistrationRequest,
            registrations::UpdatePaymentStatusRequest,
            registrations::RegistrationDto,
            registrations::CreateRegistrationResponse,
            registrations::CancelRegistrationResponse,
            occurrences::CapacityDto,
            occurrences::OccurrenceCancellationDto,
            occurrences::CancelledRegistrationDto,
            occurrences::FailedCancellationDto,
            payment_methods::DetachPaymentMethodResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service and database health"),
        (name = "Registrations", description = "Book, cancel and inspect registrations; payment is authorized at booking and captured before the event"),
        (name = "Event Occurrences", description = "Seat capacity and whole-occurrence cancellation"),
        (name = "Payment Methods", description = "Saved card management"),
    ),
    info(
        title = "Event Booking Service API",
        version = "0.1.0",
        description = "Registration, payment and capacity control for scheduled events",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(state: ApiState, health_state: HealthState, metrics_state: MetricsState) -> Router {
    let registration_routes = Router::new()
        .route("/", post(registrations::create_registration))
        .route(
            "/{id}",
            get(registrations::get_registration)
                .patch(registrations::update_registration)
                .delete(registrations::delete_registration),
        )
        .route("/{id}/cancel", post(registrations::cancel_registration))
        .route("/{id}/payment-status", patch(registrations::update_payment_status))
        .route("/child/{child_id}", get(registrations::list_by_child))
        .route("/guardian/{guardian_id}", get(registrations::list_by_guardian))
        .route(
            "/event-occurrence/{occurrence_id}",
            get(registrations::list_by_occurrence),
        );

    let occurrence_routes = Router::new()
        .route("/{id}/capacity", get(occurrences::get_capacity))
        .route("/{id}/cancel", post(occurrences::cancel_occurrence));

    let payment_method_routes = Router::new().route(
        "/{payment_method_id}/detach",
        post(payment_methods::detach_payment_method),
    );

    let api_routes = Router::new()
        .nest("/api/v1/registrations", registration_routes)
        .nest("/api/v1/event-occurrences", occurrence_routes)
        .nest("/api/v1/payment-methods", payment_method_routes)
        .with_state(state);

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(metrics_state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
