//! Error taxonomy for the booking engine.
//!
//! Every coordinator-level outcome is a typed value returned to the caller,
//! never an opaque exception: the taxonomy is preserved end-to-end to the
//! API boundary via stable error codes.

use crate::types::{ContactId, ExperienceId, SlotKey};
use thiserror::Error;

/// Typed booking outcome errors.
///
/// Identity errors (`UnknownExperience`, `UnknownSlot`) are
/// client-correctable. `SlotFull` and `DuplicateReservation` are expected
/// outcomes under normal operation, surfaced distinctly so clients can show
/// "sold out" versus "you already booked this". Storage failures are fatal
/// to the individual request and retried by the caller, never internally.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    /// The referenced experience does not exist in the catalog.
    #[error("unknown experience: {0}")]
    UnknownExperience(ExperienceId),

    /// The slot component could not be resolved to any defined slot.
    #[error("unknown slot '{slot}' for experience {experience}")]
    UnknownSlot {
        /// Experience the slot was looked up in.
        experience: ExperienceId,
        /// Raw slot component as received.
        slot: String,
    },

    /// No seats remain for the slot.
    #[error("slot {0} is fully booked")]
    SlotFull(SlotKey),

    /// The contact already holds a reservation the duplicate policy forbids.
    #[error("contact {contact} already holds a reservation for {experience}")]
    DuplicateReservation {
        /// Offending contact.
        contact: ContactId,
        /// Experience already booked.
        experience: ExperienceId,
    },

    /// The CRM has no record of the contact.
    #[error("contact {0} not found")]
    ContactNotFound(ContactId),

    /// The contact's CRM associations do not grant access to the experience.
    #[error("contact {contact} is not eligible for experience {experience}")]
    ContactNotEligible {
        /// Contact attempting the booking.
        contact: ContactId,
        /// Experience the contact asked for.
        experience: ExperienceId,
    },

    /// The request timed out waiting for its per-key turn; no row was written.
    #[error("timed out waiting for slot {0}")]
    LockTimeout(SlotKey),

    /// Reservation store I/O failure; fatal to this request.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A collaborator (CRM) was unreachable; the booking is blocked.
    #[error("collaborator failure: {0}")]
    Transient(String),
}

impl BookingError {
    /// Stable machine-readable code for the API boundary.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownExperience(_) => "UNKNOWN_EXPERIENCE",
            Self::UnknownSlot { .. } => "UNKNOWN_SLOT",
            Self::SlotFull(_) => "SLOT_FULL",
            Self::DuplicateReservation { .. } => "DUPLICATE_RESERVATION",
            Self::ContactNotFound(_) => "CONTACT_NOT_FOUND",
            Self::ContactNotEligible { .. } => "CONTACT_NOT_ELIGIBLE",
            Self::LockTimeout(_) => "TIMEOUT",
            Self::Storage(_) => "STORAGE_FAILURE",
            Self::Transient(_) => "CRM_UNAVAILABLE",
        }
    }

    /// Whether the error is an expected, non-exceptional outcome that must
    /// not be logged as a system error.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::SlotFull(_)
                | Self::DuplicateReservation { .. }
                | Self::UnknownExperience(_)
                | Self::UnknownSlot { .. }
                | Self::ContactNotEligible { .. }
                | Self::ContactNotFound(_)
        )
    }
}

/// Errors surfaced by reservation store implementations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The duplicate policy rejected the insert.
    #[error("contact {contact} already holds a reservation for {experience}")]
    Duplicate {
        /// Offending contact.
        contact: ContactId,
        /// Experience already booked.
        experience: ExperienceId,
    },

    /// Underlying storage I/O failed.
    #[error("storage I/O: {0}")]
    Io(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate {
                contact,
                experience,
            } => Self::DuplicateReservation {
                contact,
                experience,
            },
            StoreError::Io(msg) => Self::Storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlotId;

    #[test]
    fn codes_are_stable_and_distinct() {
        let full = BookingError::SlotFull(SlotKey::new(
            ExperienceId::new("X"),
            SlotId::new("X-1"),
        ));
        let dup = BookingError::DuplicateReservation {
            contact: ContactId::new("c1"),
            experience: ExperienceId::new("X"),
        };
        assert_eq!(full.code(), "SLOT_FULL");
        assert_eq!(dup.code(), "DUPLICATE_RESERVATION");
        assert_ne!(full.code(), dup.code());
    }

    #[test]
    fn capacity_conflict_is_expected() {
        let full = BookingError::SlotFull(SlotKey::new(
            ExperienceId::new("X"),
            SlotId::new("X-1"),
        ));
        assert!(full.is_expected());
        assert!(!BookingError::Storage("disk".into()).is_expected());
    }

    #[test]
    fn store_duplicate_maps_to_duplicate_reservation() {
        let err = StoreError::Duplicate {
            contact: ContactId::new("c1"),
            experience: ExperienceId::new("X"),
        };
        assert_eq!(
            BookingError::from(err).code(),
            "DUPLICATE_RESERVATION"
        );
    }
}
