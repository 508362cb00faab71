//! Open Day booking engine - slot capacity and reservation accounting.
//!
//! Visitors identified by a CRM contact id book time slots of "experiences"
//! (timed activities with limited capacity). This crate is the engine behind
//! that flow:
//!
//! - **Identity normalizer** ([`normalizer`]): one canonical slot key out of
//!   the heterogeneous reference formats older clients still send.
//! - **Capacity ledger** ([`ledger`]): derived `{max, reserved, available}`
//!   per slot, always counted fresh from the reservation store.
//! - **Reservation store** ([`store`]): durable rows, the single source of
//!   truth for every count.
//! - **Transaction coordinator** ([`coordinator`]): per-key serialized
//!   check-then-commit; the only path that creates reservations.
//! - **Catalog resolver** ([`resolver`]): CRM custom-object ids reconciled
//!   with internal experience ids.
//! - **Booking service** ([`booking`]): the orchestration of one request -
//!   eligibility gate, commit, decoupled confirmation.
//!
//! # Capacity invariant
//!
//! For every slot, at all times, the number of reservation rows referencing
//! its canonical key never exceeds `max_participants`, even under
//! concurrent requests for the same slot:
//!
//! ```text
//! available = max(0, max_participants - count(reservations by key))
//! ```
//!
//! The count on the right side is the only capacity input; there is no
//! separately maintained participant counter to drift from it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod booking;
pub mod catalog;
pub mod coordinator;
pub mod crm;
pub mod error;
pub mod ledger;
pub mod normalizer;
pub mod notify;
pub mod resolver;
pub mod store;
pub mod types;

pub use booking::{BookingOutcome, BookingService};
pub use catalog::{CatalogDefinition, CatalogError, ExperienceCatalog};
pub use coordinator::{CoordinatorConfig, ReservationCoordinator};
pub use crm::{ContactRecord, CrmClient, CrmError, CustomObject};
pub use error::{BookingError, StoreError};
pub use ledger::{CapacityLedger, SlotAvailability};
pub use normalizer::{normalize, SlotRef};
pub use notify::{ConfirmationSender, NotifyError};
pub use resolver::CatalogResolver;
pub use store::{
    DuplicatePolicy, InMemoryReservationStore, NewReservation, ReservationFilter, ReservationStore,
};
pub use types::{
    BookedSlotSummary, ContactId, CustomObjectId, Experience, ExperienceId, Reservation,
    ReservationId, SlotId, SlotKey, TimeSlot,
};
