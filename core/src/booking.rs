//! Booking service: the application-level orchestration of one reservation
//! request.
//!
//! Ties the CRM eligibility gate, the identity normalizer, the transaction
//! coordinator and the notification sink together. Booking success and
//! notification delivery are decoupled: once the coordinator commits, the
//! reservation stands regardless of what the confirmation pipeline does.

use crate::catalog::ExperienceCatalog;
use crate::coordinator::ReservationCoordinator;
use crate::crm::{ContactRecord, CrmClient};
use crate::error::BookingError;
use crate::ledger::{CapacityLedger, SlotAvailability};
use crate::normalizer::{normalize, SlotRef};
use crate::notify::ConfirmationSender;
use crate::resolver::CatalogResolver;
use crate::types::{BookedSlotSummary, ContactId, CustomObjectId, ExperienceId, Reservation};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a successful booking: the committed row plus the availability
/// the caller shows back to the visitor (same figure the confirmation page
/// and email will see).
#[derive(Clone, Debug)]
pub struct BookingOutcome {
    /// The committed reservation.
    pub reservation: Reservation,
    /// Slot availability immediately after the commit.
    pub availability: SlotAvailability,
}

/// Application service owning the reserve flow.
pub struct BookingService {
    catalog: Arc<ExperienceCatalog>,
    resolver: CatalogResolver,
    coordinator: Arc<ReservationCoordinator>,
    ledger: Arc<CapacityLedger>,
    crm: Arc<dyn CrmClient>,
    notifier: Arc<dyn ConfirmationSender>,
}

impl BookingService {
    /// Wires the service together.
    #[must_use]
    pub fn new(
        catalog: Arc<ExperienceCatalog>,
        resolver: CatalogResolver,
        coordinator: Arc<ReservationCoordinator>,
        ledger: Arc<CapacityLedger>,
        crm: Arc<dyn CrmClient>,
        notifier: Arc<dyn ConfirmationSender>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            coordinator,
            ledger,
            crm,
            notifier,
        }
    }

    /// Looks the contact up, failing with the right taxonomy entry.
    async fn require_contact(&self, contact_id: &ContactId) -> Result<ContactRecord, BookingError> {
        self.crm
            .lookup_contact(contact_id)
            .await
            .map_err(|e| BookingError::Transient(e.to_string()))?
            .ok_or_else(|| BookingError::ContactNotFound(contact_id.clone()))
    }

    /// Resolves eligibility from the CRM associations of a known contact.
    async fn resolve_eligibility(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<ExperienceId>, BookingError> {
        let objects = self
            .crm
            .associated_custom_objects(contact_id)
            .await
            .map_err(|e| BookingError::Transient(e.to_string()))?;
        let object_ids: Vec<CustomObjectId> = objects.into_iter().map(|o| o.id).collect();
        let course_ids: Vec<ExperienceId> = self.catalog.experience_ids().cloned().collect();

        Ok(self
            .resolver
            .resolve_eligible_experiences(&object_ids, &course_ids))
    }

    /// Experiences the contact's CRM associations make bookable.
    ///
    /// # Errors
    ///
    /// `ContactNotFound` for an unknown contact, `Transient` when the CRM
    /// is unreachable.
    pub async fn eligible_experiences(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<ExperienceId>, BookingError> {
        self.require_contact(contact_id).await?;
        self.resolve_eligibility(contact_id).await
    }

    /// Books one slot for one contact.
    ///
    /// CRM eligibility is booking-critical and blocks the reservation;
    /// confirmation delivery is fire-and-forget.
    ///
    /// # Errors
    ///
    /// Any [`BookingError`]: identity errors, eligibility, capacity
    /// conflict, duplicate, timeout, storage or CRM failure.
    #[tracing::instrument(skip(self), fields(contact = %contact_id, slot_ref = %slot_ref))]
    pub async fn reserve(
        &self,
        contact_id: &ContactId,
        slot_ref: &SlotRef,
    ) -> Result<BookingOutcome, BookingError> {
        let contact = self.require_contact(contact_id).await?;

        let key = normalize(&self.catalog, slot_ref)?;

        let eligible = self.resolve_eligibility(contact_id).await?;
        if !eligible.contains(&key.experience_id) {
            return Err(BookingError::ContactNotEligible {
                contact: contact_id.clone(),
                experience: key.experience_id,
            });
        }

        let reservation = self.coordinator.reserve(contact_id, slot_ref).await?;
        let availability = self.ledger.availability(&reservation.key).await?;

        self.dispatch_confirmation(&reservation, &contact.language);

        Ok(BookingOutcome {
            reservation,
            availability,
        })
    }

    /// Sends the confirmation and writes the booking ref back to the CRM in
    /// a detached task. Failures are logged; the reservation stands.
    fn dispatch_confirmation(&self, reservation: &Reservation, language: &str) {
        let Some(summary) = self.slot_summary(reservation, language) else {
            return;
        };
        let contact_id = reservation.contact_id.clone();
        let language = language.to_string();
        let slot_ref = summary.slot_ref.clone();
        let created_at = reservation.created_at;
        let notifier = Arc::clone(&self.notifier);
        let crm = Arc::clone(&self.crm);

        tokio::spawn(async move {
            if let Err(e) = notifier
                .send_confirmation(&contact_id, &language, &[summary])
                .await
            {
                tracing::warn!(contact = %contact_id, error = %e, "confirmation delivery failed");
            }

            let properties = HashMap::from([
                ("open_day_reservation_ref".to_string(), slot_ref),
                (
                    "open_day_reserved_at".to_string(),
                    created_at.to_rfc3339(),
                ),
            ]);
            if let Err(e) = crm.update_contact_properties(&contact_id, &properties).await {
                tracing::warn!(contact = %contact_id, error = %e, "CRM property write-back failed");
            }
        });
    }

    fn slot_summary(&self, reservation: &Reservation, language: &str) -> Option<BookedSlotSummary> {
        let variant = self
            .catalog
            .variant_for_language(&reservation.key.experience_id, language)?;
        let slot = self.catalog.slot(&reservation.key)?;
        Some(BookedSlotSummary {
            slot_ref: reservation.key.to_string(),
            title: variant.title.clone(),
            location: variant.location.clone(),
            start_time: slot.start_time,
            end_time: slot.end_time,
        })
    }

    /// Administrative reset passthrough.
    ///
    /// # Errors
    ///
    /// `Storage` on store failure.
    pub async fn reset_all(&self) -> Result<u64, BookingError> {
        self.coordinator.reset_all().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::catalog::tests::{catalog_with, experience};
    use crate::coordinator::CoordinatorConfig;
    use crate::crm::{ContactRecord, InMemoryCrm};
    use crate::notify::{FailingSender, RecordingSender};
    use crate::store::InMemoryReservationStore;
    use std::future::Future;
    use std::time::Duration;

    struct Fixture {
        service: BookingService,
        crm: Arc<InMemoryCrm>,
        recorder: Arc<RecordingSender>,
    }

    fn fixture_with_sender(notifier: Arc<dyn ConfirmationSender>) -> (BookingService, Arc<InMemoryCrm>) {
        let catalog = Arc::new(catalog_with(vec![
            experience("1437", "it", &[2, 2]),
            experience("1437", "en", &[2, 2]),
            experience("2001", "it", &[1]),
        ]));
        let store = Arc::new(InMemoryReservationStore::default());
        let coordinator = Arc::new(ReservationCoordinator::new(
            Arc::clone(&catalog),
            store.clone(),
            CoordinatorConfig::default(),
        ));
        let ledger = Arc::new(CapacityLedger::new(Arc::clone(&catalog), store));
        let crm = Arc::new(InMemoryCrm::new());
        let aliases = HashMap::from([("9001".to_string(), "1437".to_string())]);
        let service = BookingService::new(
            catalog,
            CatalogResolver::new(aliases),
            coordinator,
            ledger,
            crm.clone(),
            notifier,
        );
        (service, crm)
    }

    fn fixture() -> Fixture {
        let recorder = Arc::new(RecordingSender::new());
        let (service, crm) = fixture_with_sender(recorder.clone());
        Fixture {
            service,
            crm,
            recorder,
        }
    }

    fn contact(id: &str, language: &str) -> ContactRecord {
        ContactRecord {
            id: ContactId::new(id),
            email: format!("{id}@example.org"),
            language: language.to_string(),
        }
    }

    async fn wait_until<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn reserve_books_and_notifies_in_contact_language() {
        let fx = fixture();
        fx.crm.seed_contact(contact("c1", "en"), &["9001"]).await;

        let outcome = fx
            .service
            .reserve(&ContactId::new("c1"), &SlotRef::parse("1437:1"))
            .await
            .unwrap();
        assert_eq!(outcome.availability.reserved, 1);
        assert_eq!(outcome.availability.available, 1);

        let recorder = fx.recorder;
        wait_until(|| {
            let recorder = Arc::clone(&recorder);
            async move { !recorder.deliveries().await.is_empty() }
        })
        .await;
        let deliveries = recorder.deliveries().await;
        assert_eq!(deliveries[0].1, "en");
        assert_eq!(deliveries[0].2[0].slot_ref, "1437/1437-1");
        assert_eq!(deliveries[0].2[0].title, "1437 (en)");

        let crm = fx.crm;
        wait_until(|| {
            let crm = Arc::clone(&crm);
            async move {
                !crm.written_properties(&ContactId::new("c1"))
                    .await
                    .is_empty()
            }
        })
        .await;
    }

    #[tokio::test]
    async fn unknown_contact_is_rejected_before_any_write() {
        let fx = fixture();
        let err = fx
            .service
            .reserve(&ContactId::new("ghost"), &SlotRef::parse("1437:1"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONTACT_NOT_FOUND");
    }

    #[tokio::test]
    async fn ineligible_contact_is_rejected() {
        let fx = fixture();
        // Associated only with experience 2001, asking for 1437.
        fx.crm.seed_contact(contact("c1", "it"), &["2001"]).await;

        let err = fx
            .service
            .reserve(&ContactId::new("c1"), &SlotRef::parse("1437:1"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONTACT_NOT_ELIGIBLE");
    }

    #[tokio::test]
    async fn eligibility_resolves_aliases_and_dedupes() {
        let fx = fixture();
        fx.crm
            .seed_contact(contact("c1", "it"), &["9001", "1437", "unrelated"])
            .await;

        let eligible = fx
            .service
            .eligible_experiences(&ContactId::new("c1"))
            .await
            .unwrap();
        assert_eq!(eligible, vec![ExperienceId::new("1437")]);
    }

    #[tokio::test]
    async fn notification_failure_does_not_roll_back() {
        let (service, crm) = fixture_with_sender(Arc::new(FailingSender));
        crm.seed_contact(contact("c1", "it"), &["1437"]).await;

        let outcome = service
            .reserve(&ContactId::new("c1"), &SlotRef::parse("1437:1"))
            .await
            .unwrap();
        assert_eq!(outcome.availability.reserved, 1);

        // The row stands: a second attempt is a duplicate, not a retry.
        let err = service
            .reserve(&ContactId::new("c1"), &SlotRef::parse("1437:2"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_RESERVATION");
    }
}
