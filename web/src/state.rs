//! Application state shared across HTTP handlers.

use openday_core::{BookingService, CapacityLedger, ExperienceCatalog, ReservationStore};
use std::sync::Arc;

/// Shared resources for the HTTP handlers, cloned cheaply per request.
#[derive(Clone)]
pub struct AppState {
    /// Booking orchestration (eligibility gate + coordinator).
    pub booking: Arc<BookingService>,
    /// Read-side availability view.
    pub ledger: Arc<CapacityLedger>,
    /// The experience catalog.
    pub catalog: Arc<ExperienceCatalog>,
    /// Direct store access for listings.
    pub store: Arc<dyn ReservationStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        booking: Arc<BookingService>,
        ledger: Arc<CapacityLedger>,
        catalog: Arc<ExperienceCatalog>,
        store: Arc<dyn ReservationStore>,
    ) -> Self {
        Self {
            booking,
            ledger,
            catalog,
            store,
        }
    }
}
