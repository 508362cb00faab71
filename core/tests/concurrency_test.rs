//! Concurrency tests for the capacity invariant.
//!
//! Verifies that under concurrent load the coordinator admits exactly
//! `max_participants` bookings per slot and rejects the rest with
//! `SLOT_FULL`, with no double-booking and no lost updates.
//!
//! Run with: `cargo test --test concurrency_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::{Duration, TimeZone, Utc};
use openday_core::{
    CapacityLedger, ContactId, CoordinatorConfig, Experience, ExperienceCatalog, ExperienceId,
    InMemoryReservationStore, ReservationCoordinator, ReservationStore, SlotId, SlotKey, SlotRef,
    TimeSlot,
};
use std::sync::Arc;

fn single_slot_catalog(id: &str, capacity: u32) -> ExperienceCatalog {
    let experience_id = ExperienceId::new(id);
    let start = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).single().unwrap();
    ExperienceCatalog::new(vec![Experience {
        id: experience_id.clone(),
        title: format!("{id} (it)"),
        course: "Engineering".to_string(),
        location: "Building A".to_string(),
        language: "it".to_string(),
        slots: vec![TimeSlot {
            id: SlotId::from_number(&experience_id, 1),
            max_participants: capacity,
            start_time: start,
            end_time: start + Duration::minutes(45),
        }],
    }])
    .unwrap()
}

/// 64 concurrent reservation attempts against a slot with 5 seats:
/// exactly 5 succeed, 59 fail with `SLOT_FULL`, and the store holds
/// exactly 5 rows.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn capacity_invariant_holds_under_concurrent_load() {
    const ATTEMPTS: usize = 64;
    const CAPACITY: u32 = 5;

    let catalog = Arc::new(single_slot_catalog("X", CAPACITY));
    let store = Arc::new(InMemoryReservationStore::new(
        openday_core::DuplicatePolicy::Disabled,
    ));
    let coordinator = Arc::new(ReservationCoordinator::new(
        Arc::clone(&catalog),
        store.clone(),
        CoordinatorConfig::default(),
    ));

    let mut handles = Vec::with_capacity(ATTEMPTS);
    for i in 0..ATTEMPTS {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            let contact = ContactId::new(format!("contact-{i}"));
            coordinator.reserve(&contact, &SlotRef::parse("X:1")).await
        }));
    }

    let mut succeeded = 0u32;
    let mut slot_full = 0u32;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => succeeded += 1,
            Err(e) => {
                assert_eq!(e.code(), "SLOT_FULL", "unexpected failure: {e}");
                slot_full += 1;
            }
        }
    }

    assert_eq!(succeeded, CAPACITY);
    assert_eq!(slot_full, u32::try_from(ATTEMPTS).unwrap() - CAPACITY);

    let key = SlotKey::new(ExperienceId::new("X"), SlotId::new("X-1"));
    assert_eq!(store.count_by_key(&key).await.unwrap(), CAPACITY);
}

/// The last-seat race: two contacts, one seat. Exactly one wins, the other
/// sees `SLOT_FULL`, and availability afterwards reads zero.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_seat_goes_to_exactly_one_contact() {
    let catalog = Arc::new(single_slot_catalog("S", 1));
    let store = Arc::new(InMemoryReservationStore::default());
    let coordinator = Arc::new(ReservationCoordinator::new(
        Arc::clone(&catalog),
        store.clone(),
        CoordinatorConfig::default(),
    ));
    let ledger = CapacityLedger::new(Arc::clone(&catalog), store);

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .reserve(&ContactId::new("contact-1"), &SlotRef::parse("S:1"))
                .await
        })
    };
    let second = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .reserve(&ContactId::new("contact-2"), &SlotRef::parse("S:1"))
                .await
        })
    };

    let outcomes = [
        first.await.expect("task panicked"),
        second.await.expect("task panicked"),
    ];
    let winners = outcomes.iter().filter(|o| o.is_ok()).count();
    let losers = outcomes
        .iter()
        .filter(|o| matches!(o, Err(e) if e.code() == "SLOT_FULL"))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 1);

    let key = SlotKey::new(ExperienceId::new("S"), SlotId::new("S-1"));
    let availability = ledger.availability(&key).await.unwrap();
    assert_eq!(availability.reserved, 1);
    assert_eq!(availability.available, 0);
}

/// Bookings for unrelated slots do not serialize against each other: a full
/// slot never affects its neighbour's outcome.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unrelated_slots_proceed_independently() {
    let experience_id = ExperienceId::new("X");
    let start = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).single().unwrap();
    let slots = (1..=2)
        .map(|n| TimeSlot {
            id: SlotId::from_number(&experience_id, n),
            max_participants: 1,
            start_time: start,
            end_time: start + Duration::minutes(45),
        })
        .collect();
    let catalog = Arc::new(
        ExperienceCatalog::new(vec![Experience {
            id: experience_id,
            title: "X (it)".to_string(),
            course: "Engineering".to_string(),
            location: "Building A".to_string(),
            language: "it".to_string(),
            slots,
        }])
        .unwrap(),
    );
    let store = Arc::new(InMemoryReservationStore::new(
        openday_core::DuplicatePolicy::PerSlot,
    ));
    let coordinator = Arc::new(ReservationCoordinator::new(
        Arc::clone(&catalog),
        store,
        CoordinatorConfig::default(),
    ));

    let mut handles = Vec::new();
    for slot in 1..=2u32 {
        for contact in 0..8u32 {
            let coordinator = Arc::clone(&coordinator);
            handles.push(tokio::spawn(async move {
                let contact = ContactId::new(format!("c-{slot}-{contact}"));
                (
                    slot,
                    coordinator
                        .reserve(&contact, &SlotRef::parse(&format!("X:{slot}")))
                        .await,
                )
            }));
        }
    }

    let mut wins_per_slot = [0u32; 2];
    for handle in handles {
        let (slot, outcome) = handle.await.expect("task panicked");
        if outcome.is_ok() {
            wins_per_slot[(slot - 1) as usize] += 1;
        }
    }
    assert_eq!(wins_per_slot, [1, 1]);
}
