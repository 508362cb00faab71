//! Capacity ledger: derived availability per slot.
//!
//! The ledger owns no state of its own. Every figure it returns is
//! recomputed from the reservation store at call time, so it can never
//! drift from the rows - subtracting both a stored participant counter and
//! the matching reservation rows is the double-counting bug this replaces.

use crate::catalog::ExperienceCatalog;
use crate::error::BookingError;
use crate::store::ReservationStore;
use crate::types::{ExperienceId, SlotKey, TimeSlot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Availability of one slot at one point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    /// Canonical slot key.
    pub key: SlotKey,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
    /// Configured capacity ceiling.
    pub max: u32,
    /// Confirmed reservation count, straight from the store.
    pub reserved: u32,
    /// Remaining seats, clamped at zero.
    pub available: u32,
}

/// Read-side view over catalog capacity and store counts.
pub struct CapacityLedger {
    catalog: Arc<ExperienceCatalog>,
    store: Arc<dyn ReservationStore>,
}

impl CapacityLedger {
    /// Creates a ledger over a catalog and a store.
    #[must_use]
    pub fn new(catalog: Arc<ExperienceCatalog>, store: Arc<dyn ReservationStore>) -> Self {
        Self { catalog, store }
    }

    fn availability_for(slot: &TimeSlot, key: SlotKey, reserved: u32) -> SlotAvailability {
        // Clamping is a defensive secondary guarantee; the coordinator is
        // responsible for never letting reserved exceed max in the first
        // place.
        let available = slot.max_participants.saturating_sub(reserved);
        SlotAvailability {
            key,
            start_time: slot.start_time,
            end_time: slot.end_time,
            max: slot.max_participants,
            reserved,
            available,
        }
    }

    /// Availability of one slot, freshly counted from the store.
    ///
    /// # Errors
    ///
    /// `UnknownExperience`/`UnknownSlot` when the key points outside the
    /// catalog; `Storage` on store I/O failure.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn availability(&self, key: &SlotKey) -> Result<SlotAvailability, BookingError> {
        if !self.catalog.contains(&key.experience_id) {
            return Err(BookingError::UnknownExperience(key.experience_id.clone()));
        }
        let slot = self
            .catalog
            .slot(key)
            .ok_or_else(|| BookingError::UnknownSlot {
                experience: key.experience_id.clone(),
                slot: key.slot_id.as_str().to_string(),
            })?;

        let reserved = self.store.count_by_key(key).await?;
        Ok(Self::availability_for(slot, key.clone(), reserved))
    }

    /// Per-slot availability for every slot of an experience.
    ///
    /// A pure projection over catalog and store, safe to recompute.
    ///
    /// # Errors
    ///
    /// `UnknownExperience` for an uncatalogued id; `Storage` on store I/O
    /// failure.
    pub async fn list_availability(
        &self,
        experience_id: &ExperienceId,
    ) -> Result<Vec<SlotAvailability>, BookingError> {
        let slots = self
            .catalog
            .slots(experience_id)
            .ok_or_else(|| BookingError::UnknownExperience(experience_id.clone()))?;

        let mut result = Vec::with_capacity(slots.len());
        for slot in slots {
            let key = SlotKey::new(experience_id.clone(), slot.id.clone());
            let reserved = self.store.count_by_key(&key).await?;
            result.push(Self::availability_for(slot, key, reserved));
        }
        Ok(result)
    }

    /// Whole-catalog availability snapshot for operational dashboards.
    ///
    /// # Errors
    ///
    /// `Storage` on store I/O failure.
    pub async fn snapshot(&self) -> Result<Vec<SlotAvailability>, BookingError> {
        let ids: Vec<ExperienceId> = self.catalog.experience_ids().cloned().collect();
        let mut result = Vec::new();
        for id in ids {
            result.extend(self.list_availability(&id).await?);
        }
        Ok(result)
    }
}
