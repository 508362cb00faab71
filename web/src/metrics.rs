//! Business metrics for the booking server.
//!
//! Counters for booking outcomes; capacity conflicts count as normal
//! outcomes, not errors.

use metrics::describe_counter;

/// Register metric descriptions once at startup.
pub fn register_booking_metrics() {
    describe_counter!(
        "openday_reservations_total",
        "Total booking attempts by outcome (confirmed, or the rejection code)"
    );
    describe_counter!(
        "openday_reset_total",
        "Administrative reservation resets performed"
    );
    tracing::info!("booking metrics registered");
}

/// Record a confirmed reservation.
pub fn record_reservation_confirmed() {
    metrics::counter!("openday_reservations_total", "outcome" => "confirmed").increment(1);
}

/// Record a rejected booking attempt by its stable error code.
pub fn record_reservation_rejected(code: &'static str) {
    metrics::counter!("openday_reservations_total", "outcome" => code).increment(1);
}
