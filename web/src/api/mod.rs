//! HTTP API handlers.

pub mod admin;
pub mod availability;
pub mod reservations;

use openday_core::SlotAvailability;
use serde::Serialize;

/// Per-slot availability as the API serves it.
///
/// `slot_ref` is the stable reference clients must echo back verbatim when
/// booking; it is chosen here, never reconstructed client-side.
#[derive(Debug, Serialize)]
pub struct SlotAvailabilityResponse {
    /// Canonical slot reference (`"<experienceId>/<slotId>"`).
    pub slot_ref: String,
    /// Slot identifier.
    pub slot_id: String,
    /// Scheduled start.
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// Scheduled end.
    pub end_time: chrono::DateTime<chrono::Utc>,
    /// Capacity ceiling.
    pub max: u32,
    /// Confirmed reservations.
    pub reserved: u32,
    /// Remaining seats.
    pub available: u32,
}

impl From<SlotAvailability> for SlotAvailabilityResponse {
    fn from(availability: SlotAvailability) -> Self {
        Self {
            slot_ref: availability.key.to_string(),
            slot_id: availability.key.slot_id.as_str().to_string(),
            start_time: availability.start_time,
            end_time: availability.end_time,
            max: availability.max,
            reserved: availability.reserved,
            available: availability.available,
        }
    }
}
