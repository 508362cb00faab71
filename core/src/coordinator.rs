//! Reservation transaction coordinator: the only path that creates
//! reservations.
//!
//! The check-then-commit sequence for one canonical slot key is serialized
//! behind a per-key async mutex, so at most `max_participants` reservations
//! can ever exist for a slot no matter how many requests interleave.
//! Unrelated slots proceed fully in parallel.

use crate::catalog::ExperienceCatalog;
use crate::error::BookingError;
use crate::normalizer::{normalize, SlotRef};
use crate::store::{NewReservation, ReservationStore};
use crate::types::{ContactId, Reservation, SlotKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

/// Coordinator tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct CoordinatorConfig {
    /// Bound on how long a request may wait for its per-key turn. Timing
    /// out abandons the booking with no row written.
    pub lock_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
        }
    }
}

/// Per-key mutual exclusion registry.
///
/// The outer std mutex only guards the map of lock handles; it is never held
/// across an await. The per-key tokio mutex is what serializes the
/// check-then-commit critical section.
struct SlotLocks {
    inner: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SlotLocks {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, key: &SlotKey) -> Arc<AsyncMutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(key.clone()).or_default())
    }
}

/// Owns the atomic capacity-check-then-commit booking sequence.
pub struct ReservationCoordinator {
    catalog: Arc<ExperienceCatalog>,
    store: Arc<dyn ReservationStore>,
    locks: SlotLocks,
    config: CoordinatorConfig,
}

impl ReservationCoordinator {
    /// Creates a coordinator over a catalog and a store.
    #[must_use]
    pub fn new(
        catalog: Arc<ExperienceCatalog>,
        store: Arc<dyn ReservationStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            locks: SlotLocks::new(),
            config,
        }
    }

    /// Attempts to book one slot for one contact.
    ///
    /// Protocol: normalize the reference, take the per-key lock (bounded
    /// wait), recompute the count fresh from the store, admit or reject,
    /// insert. Every outcome is a typed [`BookingError`]; a lock timeout
    /// leaves no side effects.
    ///
    /// # Errors
    ///
    /// `UnknownExperience`/`UnknownSlot` for unresolvable references,
    /// `SlotFull` when no seats remain, `DuplicateReservation` when the
    /// store's policy rejects the contact, `LockTimeout` when the per-key
    /// wait exceeds the configured bound, `Storage` on store failure.
    #[tracing::instrument(skip(self), fields(contact = %contact_id, slot_ref = %slot_ref))]
    pub async fn reserve(
        &self,
        contact_id: &ContactId,
        slot_ref: &SlotRef,
    ) -> Result<Reservation, BookingError> {
        let key = normalize(&self.catalog, slot_ref)?;

        // Normalization guarantees the slot exists; look it up before
        // taking the lock so the critical section stays minimal.
        let max_participants = self
            .catalog
            .slot(&key)
            .map(|slot| slot.max_participants)
            .ok_or_else(|| BookingError::UnknownSlot {
                experience: key.experience_id.clone(),
                slot: key.slot_id.as_str().to_string(),
            })?;

        let handle = self.locks.handle(&key);
        let Ok(_guard) = tokio::time::timeout(self.config.lock_timeout, handle.lock()).await
        else {
            tracing::warn!(key = %key, "gave up waiting for slot lock");
            return Err(BookingError::LockTimeout(key));
        };

        // Duplicate check ahead of the capacity check: the holder of the
        // last seat must see "already booked", never "sold out".
        if let Some(existing) = self.store.find_conflict(contact_id, &key).await? {
            tracing::info!(key = %key, existing = %existing.id, "duplicate booking attempt");
            return Err(BookingError::DuplicateReservation {
                contact: contact_id.clone(),
                experience: key.experience_id,
            });
        }

        // Fresh count under the lock; never a cached value.
        let reserved = self.store.count_by_key(&key).await?;
        if reserved >= max_participants {
            tracing::info!(key = %key, reserved, max_participants, "slot full");
            return Err(BookingError::SlotFull(key));
        }

        let reservation = self
            .store
            .create(NewReservation {
                contact_id: contact_id.clone(),
                key: key.clone(),
            })
            .await?;

        tracing::info!(
            key = %key,
            reservation = %reservation.id,
            remaining = max_participants - reserved - 1,
            "reservation committed"
        );
        Ok(reservation)
    }

    /// Administrative reset: clears every reservation.
    ///
    /// # Errors
    ///
    /// `Storage` on store failure.
    pub async fn reset_all(&self) -> Result<u64, BookingError> {
        let deleted = self.store.delete_all().await?;
        tracing::info!(deleted, "all reservations cleared");
        Ok(deleted)
    }
}
