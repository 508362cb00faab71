//! Reservation store: durable ownership of reservation rows.
//!
//! The store is the single source of truth for capacity accounting; the
//! ledger and coordinator only ever derive counts from it. Denormalized
//! participant counters are exactly the drift this design retires.

use crate::error::StoreError;
use crate::types::{ContactId, ExperienceId, Reservation, ReservationId, SlotKey};
use async_trait::async_trait;
use chrono::Utc;
use std::str::FromStr;
use tokio::sync::RwLock;

/// How many simultaneous reservations one contact may hold.
///
/// Cross-experience bookings are always allowed; the policy governs repeats
/// within one experience. The historical system enforced this ad hoc and
/// inconsistently - here it is explicit and testable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// At most one active reservation per contact per experience.
    #[default]
    PerExperience,
    /// At most one active reservation per contact per slot.
    PerSlot,
    /// No duplicate restriction.
    Disabled,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-experience" => Ok(Self::PerExperience),
            "per-slot" => Ok(Self::PerSlot),
            "disabled" => Ok(Self::Disabled),
            other => Err(format!("unknown duplicate policy '{other}'")),
        }
    }
}

/// Payload for a reservation insert; id and timestamp are storage-assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReservation {
    /// Visitor identity.
    pub contact_id: ContactId,
    /// Canonical slot being booked.
    pub key: SlotKey,
}

/// Filter for reservation listings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    /// Restrict to one contact.
    pub contact_id: Option<ContactId>,
    /// Restrict to one experience.
    pub experience_id: Option<ExperienceId>,
}

impl ReservationFilter {
    /// Whether a row passes the filter.
    #[must_use]
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.contact_id
            .as_ref()
            .is_none_or(|c| *c == reservation.contact_id)
            && self
                .experience_id
                .as_ref()
                .is_none_or(|e| *e == reservation.key.experience_id)
    }
}

/// Durable CRUD for reservation rows.
///
/// `count_by_key` is the one query the rest of the system depends on; every
/// availability figure is derived from it.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts a reservation, enforcing the duplicate policy.
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate` when the policy rejects the insert,
    /// `StoreError::Io` on storage failure.
    async fn create(&self, new: NewReservation) -> Result<Reservation, StoreError>;

    /// The existing reservation the duplicate policy would reject a new
    /// `(contact, key)` insert for, if any.
    ///
    /// Lets the coordinator report `Duplicate` ahead of the capacity check,
    /// so the holder of the last seat sees "already booked", never "sold
    /// out". `create` still enforces the policy independently.
    ///
    /// # Errors
    ///
    /// `StoreError::Io` on storage failure.
    async fn find_conflict(
        &self,
        contact_id: &ContactId,
        key: &SlotKey,
    ) -> Result<Option<Reservation>, StoreError>;

    /// Counts confirmed reservations for one canonical key.
    ///
    /// # Errors
    ///
    /// `StoreError::Io` on storage failure.
    async fn count_by_key(&self, key: &SlotKey) -> Result<u32, StoreError>;

    /// Lists reservations matching a filter, newest first.
    ///
    /// # Errors
    ///
    /// `StoreError::Io` on storage failure.
    async fn list(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, StoreError>;

    /// Administrative reset: deletes every reservation, returning the count.
    ///
    /// Used when the event is re-run across days.
    ///
    /// # Errors
    ///
    /// `StoreError::Io` on storage failure.
    async fn delete_all(&self) -> Result<u64, StoreError>;
}

/// In-memory reservation store.
///
/// The write lock makes the duplicate check and the insert one atomic step,
/// mirroring what the Postgres implementation gets from a guarded insert.
pub struct InMemoryReservationStore {
    policy: DuplicatePolicy,
    rows: RwLock<Vec<Reservation>>,
}

impl InMemoryReservationStore {
    /// Creates an empty store with the given duplicate policy.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            rows: RwLock::new(Vec::new()),
        }
    }

    fn conflicts(policy: DuplicatePolicy, row: &Reservation, contact: &ContactId, key: &SlotKey) -> bool {
        row.contact_id == *contact
            && match policy {
                DuplicatePolicy::PerExperience => row.key.experience_id == key.experience_id,
                DuplicatePolicy::PerSlot => row.key == *key,
                DuplicatePolicy::Disabled => false,
            }
    }
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn create(&self, new: NewReservation) -> Result<Reservation, StoreError> {
        let mut rows = self.rows.write().await;

        let conflict = rows
            .iter()
            .any(|row| Self::conflicts(self.policy, row, &new.contact_id, &new.key));
        if conflict {
            return Err(StoreError::Duplicate {
                contact: new.contact_id,
                experience: new.key.experience_id,
            });
        }

        let reservation = Reservation {
            id: ReservationId::new(),
            contact_id: new.contact_id,
            key: new.key,
            created_at: Utc::now(),
        };
        rows.push(reservation.clone());
        Ok(reservation)
    }

    async fn find_conflict(
        &self,
        contact_id: &ContactId,
        key: &SlotKey,
    ) -> Result<Option<Reservation>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| Self::conflicts(self.policy, row, contact_id, key))
            .cloned())
    }

    async fn count_by_key(&self, key: &SlotKey) -> Result<u32, StoreError> {
        let rows = self.rows.read().await;
        let count = rows.iter().filter(|row| row.key == *key).count();
        u32::try_from(count).map_err(|_| StoreError::Io("reservation count overflow".into()))
    }

    async fn list(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, StoreError> {
        let rows = self.rows.read().await;
        let mut matched: Vec<Reservation> = rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        let deleted = rows.len() as u64;
        rows.clear();
        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::SlotId;

    fn key(experience: &str, slot: &str) -> SlotKey {
        SlotKey::new(ExperienceId::new(experience), SlotId::new(slot))
    }

    fn booking(contact: &str, experience: &str, slot: &str) -> NewReservation {
        NewReservation {
            contact_id: ContactId::new(contact),
            key: key(experience, slot),
        }
    }

    #[tokio::test]
    async fn count_follows_inserts() {
        let store = InMemoryReservationStore::default();
        store.create(booking("c1", "X", "X-1")).await.unwrap();
        store.create(booking("c2", "X", "X-1")).await.unwrap();
        store.create(booking("c3", "X", "X-2")).await.unwrap();

        assert_eq!(store.count_by_key(&key("X", "X-1")).await.unwrap(), 2);
        assert_eq!(store.count_by_key(&key("X", "X-2")).await.unwrap(), 1);
        assert_eq!(store.count_by_key(&key("X", "X-3")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn per_experience_policy_rejects_second_booking() {
        let store = InMemoryReservationStore::new(DuplicatePolicy::PerExperience);
        store.create(booking("c1", "X", "X-1")).await.unwrap();

        // Same experience, different slot: rejected.
        let err = store.create(booking("c1", "X", "X-2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));

        // Different experience: allowed.
        store.create(booking("c1", "Y", "Y-1")).await.unwrap();
    }

    #[tokio::test]
    async fn per_slot_policy_allows_other_slots() {
        let store = InMemoryReservationStore::new(DuplicatePolicy::PerSlot);
        store.create(booking("c1", "X", "X-1")).await.unwrap();
        store.create(booking("c1", "X", "X-2")).await.unwrap();

        let err = store.create(booking("c1", "X", "X-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn disabled_policy_allows_repeats() {
        let store = InMemoryReservationStore::new(DuplicatePolicy::Disabled);
        store.create(booking("c1", "X", "X-1")).await.unwrap();
        store.create(booking("c1", "X", "X-1")).await.unwrap();
        assert_eq!(store.count_by_key(&key("X", "X-1")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_filters_by_contact_and_experience() {
        let store = InMemoryReservationStore::new(DuplicatePolicy::Disabled);
        store.create(booking("c1", "X", "X-1")).await.unwrap();
        store.create(booking("c1", "Y", "Y-1")).await.unwrap();
        store.create(booking("c2", "X", "X-1")).await.unwrap();

        let filter = ReservationFilter {
            contact_id: Some(ContactId::new("c1")),
            ..ReservationFilter::default()
        };
        assert_eq!(store.list(&filter).await.unwrap().len(), 2);

        let filter = ReservationFilter {
            contact_id: Some(ContactId::new("c1")),
            experience_id: Some(ExperienceId::new("X")),
        };
        assert_eq!(store.list(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_all_reports_the_count() {
        let store = InMemoryReservationStore::new(DuplicatePolicy::Disabled);
        store.create(booking("c1", "X", "X-1")).await.unwrap();
        store.create(booking("c2", "X", "X-1")).await.unwrap();

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert_eq!(store.count_by_key(&key("X", "X-1")).await.unwrap(), 0);
    }

    #[test]
    fn duplicate_policy_parses_from_config_strings() {
        assert_eq!(
            "per-experience".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::PerExperience
        );
        assert_eq!(
            "per-slot".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::PerSlot
        );
        assert_eq!(
            "disabled".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::Disabled
        );
        assert!("sometimes".parse::<DuplicatePolicy>().is_err());
    }
}
