//! Catalog and availability query endpoints.
//!
//! - `GET /api/experiences` - catalog listing with per-slot availability
//! - `GET /api/experiences/:id/availability` - one experience's slots

use super::SlotAvailabilityResponse;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use openday_core::{ContactId, ExperienceId};
use serde::{Deserialize, Serialize};

/// Query parameters for the catalog listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Restrict the listing to experiences this contact may book.
    pub contact_id: Option<String>,
    /// Restrict to one language's variant rows.
    pub language: Option<String>,
}

/// One experience row in the catalog listing.
#[derive(Debug, Serialize)]
pub struct ExperienceResponse {
    /// Experience id.
    pub experience_id: String,
    /// Display title.
    pub title: String,
    /// Parent course.
    pub course: String,
    /// Location.
    pub location: String,
    /// Language of this variant.
    pub language: String,
    /// Slots with live availability and the stable `slot_ref` to book with.
    pub slots: Vec<SlotAvailabilityResponse>,
}

/// Catalog listing with live availability.
///
/// With `contact_id`, only the experiences the contact's CRM associations
/// make bookable are returned.
pub async fn list_experiences(
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExperienceResponse>>, ApiError> {
    let eligible = match &query.contact_id {
        Some(contact_id) => Some(
            state
                .booking
                .eligible_experiences(&ContactId::new(contact_id.as_str()))
                .await?,
        ),
        None => None,
    };

    let mut result = Vec::new();
    for id in state.catalog.experience_ids() {
        if let Some(eligible) = &eligible {
            if !eligible.contains(id) {
                continue;
            }
        }
        let availability = state.ledger.list_availability(id).await?;
        for variant in state.catalog.variants(id) {
            if let Some(language) = &query.language {
                if variant.language != *language {
                    continue;
                }
            }
            result.push(ExperienceResponse {
                experience_id: variant.id.as_str().to_string(),
                title: variant.title.clone(),
                course: variant.course.clone(),
                location: variant.location.clone(),
                language: variant.language.clone(),
                slots: availability
                    .iter()
                    .cloned()
                    .map(SlotAvailabilityResponse::from)
                    .collect(),
            });
        }
    }
    Ok(Json(result))
}

/// Per-slot availability for one experience.
pub async fn get_experience_availability(
    Path(experience_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<SlotAvailabilityResponse>>, ApiError> {
    let availability = state
        .ledger
        .list_availability(&ExperienceId::new(experience_id))
        .await?;
    Ok(Json(
        availability
            .into_iter()
            .map(SlotAvailabilityResponse::from)
            .collect(),
    ))
}
