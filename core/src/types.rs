//! Domain types for the Open Day booking engine.
//!
//! All externally-assigned identifiers (contacts, experiences, slots, CRM
//! custom objects) are opaque string newtypes. Historically these arrived
//! both as numeric-looking and slug-like strings, so they are never coerced
//! to numbers outside the single fallback in the resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// External identifier of a bookable experience.
///
/// Not unique at the catalog level: a single logical experience may have one
/// row per language sharing the same id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperienceId(String);

impl ExperienceId {
    /// Creates an `ExperienceId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperienceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExperienceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a time slot, unique within its experience.
///
/// Derived from a 1-based slot number as `"<experienceId>-<n>"` when the
/// catalog is built, but treated as opaque everywhere else.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Creates a `SlotId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the conventional slot id for a 1-based slot number.
    #[must_use]
    pub fn from_number(experience_id: &ExperienceId, number: u32) -> Self {
        Self(format!("{experience_id}-{number}"))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// External CRM identity of a visitor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    /// Creates a `ContactId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContactId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a CRM custom object associated with a contact.
///
/// The CRM is loosely typed and may serialize these as numbers or strings;
/// callers must pass them through the catalog resolver before comparing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomObjectId(String);

impl CustomObjectId {
    /// Creates a `CustomObjectId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage-assigned identity of a reservation row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Canonical slot key
// ============================================================================

/// The single canonical identifier for an (experience, slot) pair.
///
/// All aggregation (capacity counting, per-key locking, storage lookups)
/// goes through this key. The identity normalizer is the only place legacy
/// string formats (`"exp_slot"`, `"exp:2"`) are translated into it.
///
/// The canonical serialization is `"<experienceId>/<slotId>"`; it is what
/// catalog listings hand to clients, and clients echo it back verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    /// Experience component.
    pub experience_id: ExperienceId,
    /// Slot component.
    pub slot_id: SlotId,
}

impl SlotKey {
    /// Creates a `SlotKey`.
    #[must_use]
    pub const fn new(experience_id: ExperienceId, slot_id: SlotId) -> Self {
        Self {
            experience_id,
            slot_id,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.experience_id, self.slot_id)
    }
}

// ============================================================================
// Catalog entities
// ============================================================================

/// A schedulable sub-unit of an experience with its own capacity ceiling.
///
/// `available` is never stored here; it is always derived from the
/// reservation store by the capacity ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Slot identifier, unique within the experience.
    pub id: SlotId,
    /// Capacity ceiling, fixed per slot.
    pub max_participants: u32,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
}

/// A bookable activity definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    /// External identifier; shared across language variants.
    pub id: ExperienceId,
    /// Display title, locale-scoped.
    pub title: String,
    /// Parent course or programme.
    pub course: String,
    /// Where the activity takes place.
    pub location: String,
    /// Language of this variant (e.g. `"it"`, `"en"`).
    pub language: String,
    /// Time slots of the experience.
    pub slots: Vec<TimeSlot>,
}

// ============================================================================
// Reservations
// ============================================================================

/// One visitor's booking of one time slot.
///
/// Created exactly once per successful booking transaction, never mutated,
/// deleted only by an administrative reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Storage-assigned identity.
    pub id: ReservationId,
    /// Visitor identity (opaque CRM contact id).
    pub contact_id: ContactId,
    /// Canonical reference into the slot catalog.
    pub key: SlotKey,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Summary of a booked slot handed to the notification collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSlotSummary {
    /// Canonical slot reference (`"<experienceId>/<slotId>"`).
    pub slot_ref: String,
    /// Experience title in the contact's language.
    pub title: String,
    /// Location of the activity.
    pub location: String,
    /// Scheduled start.
    pub start_time: DateTime<Utc>,
    /// Scheduled end.
    pub end_time: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn slot_key_display_uses_canonical_separator() {
        let key = SlotKey::new(ExperienceId::new("robotics-lab"), SlotId::new("robotics-lab-2"));
        assert_eq!(key.to_string(), "robotics-lab/robotics-lab-2");
    }

    #[test]
    fn slot_id_from_number_is_one_based_suffix() {
        let id = SlotId::from_number(&ExperienceId::new("X"), 2);
        assert_eq!(id.as_str(), "X-2");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ExperienceId::new("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
    }
}
