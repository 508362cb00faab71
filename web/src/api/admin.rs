//! Administrative endpoints.
//!
//! - `GET /api/admin/availability` - whole-catalog snapshot for dashboards
//! - `POST /api/admin/reset` - clear every reservation (event re-run)

use super::SlotAvailabilityResponse;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Response after an administrative reset.
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    /// Number of reservations deleted.
    pub deleted: u64,
}

/// Whole-catalog availability snapshot.
pub async fn availability_snapshot(
    State(state): State<AppState>,
) -> Result<Json<Vec<SlotAvailabilityResponse>>, ApiError> {
    let snapshot = state.ledger.snapshot().await?;
    Ok(Json(
        snapshot
            .into_iter()
            .map(SlotAvailabilityResponse::from)
            .collect(),
    ))
}

/// Delete every reservation, for re-running the event across days.
pub async fn reset_reservations(
    State(state): State<AppState>,
) -> Result<Json<ResetResponse>, ApiError> {
    let deleted = state.booking.reset_all().await?;
    tracing::info!(deleted, "administrative reservation reset");
    Ok(Json(ResetResponse { deleted }))
}
