//! Reservation endpoints.
//!
//! - `POST /api/reservations` - book one slot for a contact
//! - `GET /api/contacts/:id/reservations` - a contact's bookings

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use openday_core::{ContactId, ExperienceId, ReservationFilter, SlotId, SlotRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to book one slot.
///
/// Either `slot_ref` (as handed out by the catalog listing, legacy formats
/// accepted) or the explicit `experience_id` + `slot_id` pair.
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    /// CRM contact id of the visitor.
    pub contact_id: String,
    /// Slot reference string.
    pub slot_ref: Option<String>,
    /// Explicit experience id (with `slot_id`).
    pub experience_id: Option<String>,
    /// Explicit slot id (with `experience_id`).
    pub slot_id: Option<String>,
}

/// Response after a successful booking.
#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    /// Created reservation id.
    pub reservation_id: Uuid,
    /// Canonical slot reference.
    pub slot_ref: String,
    /// Seats remaining after this booking.
    pub available: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One reservation row in a contact listing.
#[derive(Debug, Serialize)]
pub struct ReservationSummary {
    /// Reservation id.
    pub reservation_id: Uuid,
    /// Canonical slot reference.
    pub slot_ref: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

fn slot_ref_from(request: &ReserveRequest) -> Result<SlotRef, ApiError> {
    match (&request.experience_id, &request.slot_id, &request.slot_ref) {
        (Some(experience_id), Some(slot_id), _) => Ok(SlotRef::Pair {
            experience_id: ExperienceId::new(experience_id.as_str()),
            slot_id: SlotId::new(slot_id.as_str()),
        }),
        (_, _, Some(raw)) => Ok(SlotRef::parse(raw)),
        _ => Err(ApiError::bad_request(
            "either slot_ref or experience_id + slot_id is required",
        )),
    }
}

/// Book one slot for a contact.
///
/// Outcomes map to stable error codes: `UNKNOWN_EXPERIENCE`,
/// `UNKNOWN_SLOT`, `SLOT_FULL`, `DUPLICATE_RESERVATION`,
/// `CONTACT_NOT_ELIGIBLE`, `CONTACT_NOT_FOUND`, `TIMEOUT`,
/// `CRM_UNAVAILABLE`.
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<ReserveResponse>), ApiError> {
    if request.contact_id.trim().is_empty() {
        return Err(ApiError::bad_request("contact_id is required"));
    }
    let slot_ref = slot_ref_from(&request)?;
    let contact_id = ContactId::new(request.contact_id);

    let outcome = state.booking.reserve(&contact_id, &slot_ref).await;
    match outcome {
        Ok(outcome) => {
            metrics::record_reservation_confirmed();
            Ok((
                StatusCode::CREATED,
                Json(ReserveResponse {
                    reservation_id: *outcome.reservation.id.as_uuid(),
                    slot_ref: outcome.reservation.key.to_string(),
                    available: outcome.availability.available,
                    created_at: outcome.reservation.created_at,
                }),
            ))
        }
        Err(err) => {
            metrics::record_reservation_rejected(err.code());
            Err(err.into())
        }
    }
}

/// List a contact's reservations, newest first.
pub async fn list_contact_reservations(
    Path(contact_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReservationSummary>>, ApiError> {
    let filter = ReservationFilter {
        contact_id: Some(ContactId::new(contact_id)),
        ..ReservationFilter::default()
    };
    let rows = state
        .store
        .list(&filter)
        .await
        .map_err(|e| ApiError::internal("failed to list reservations").with_source(e.into()))?;

    Ok(Json(
        rows.into_iter()
            .map(|r| ReservationSummary {
                reservation_id: *r.id.as_uuid(),
                slot_ref: r.key.to_string(),
                created_at: r.created_at,
            })
            .collect(),
    ))
}
