//! Router configuration.

use crate::api::{admin, availability, reservations};
use crate::state::AppState;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Liveness probe.
async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe.
async fn readiness_check() -> StatusCode {
    StatusCode::OK
}

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Catalog and availability (read side)
        .route("/experiences", get(availability::list_experiences))
        .route(
            "/experiences/:id/availability",
            get(availability::get_experience_availability),
        )
        // Booking
        .route("/reservations", post(reservations::create_reservation))
        .route(
            "/contacts/:id/reservations",
            get(reservations::list_contact_reservations),
        )
        // Administrative surface
        .route("/admin/availability", get(admin::availability_snapshot))
        .route("/admin/reset", post(admin::reset_reservations));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
