//! Error types for web handlers.
//!
//! Bridges the typed booking outcomes to HTTP responses, preserving the
//! stable error codes end-to-end. Expected outcomes (full slot, duplicate)
//! never log as system errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use openday_core::BookingError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code.
    status: StatusCode,
    /// Stable machine-readable code.
    code: String,
    /// User-facing message.
    message: String,
    /// Internal error for logging, not exposed to the client.
    source: Option<anyhow::Error>,
}

impl ApiError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, code: String, message: String) -> Self {
        Self {
            status,
            code,
            message,
            source: None,
        }
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST".to_string(),
            message.into(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND".to_string(),
            format!("{resource} with id {id} not found"),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR".to_string(),
            message.into(),
        )
    }

    /// Attach an internal source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// The stable code, for tests.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The HTTP status, for tests.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        let status = match &err {
            BookingError::UnknownExperience(_)
            | BookingError::UnknownSlot { .. }
            | BookingError::ContactNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::SlotFull(_) | BookingError::DuplicateReservation { .. } => {
                StatusCode::CONFLICT
            }
            BookingError::ContactNotEligible { .. } => StatusCode::FORBIDDEN,
            BookingError::LockTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.code().to_string(), err.to_string())
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Stable machine-readable code.
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openday_core::{ContactId, ExperienceId, SlotId, SlotKey};

    fn key() -> SlotKey {
        SlotKey::new(ExperienceId::new("X"), SlotId::new("X-1"))
    }

    #[test]
    fn slot_full_and_duplicate_share_status_but_not_code() {
        let full = ApiError::from(BookingError::SlotFull(key()));
        let duplicate = ApiError::from(BookingError::DuplicateReservation {
            contact: ContactId::new("c1"),
            experience: ExperienceId::new("X"),
        });
        assert_eq!(full.status(), StatusCode::CONFLICT);
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
        assert_eq!(full.code(), "SLOT_FULL");
        assert_eq!(duplicate.code(), "DUPLICATE_RESERVATION");
    }

    #[test]
    fn identity_errors_map_to_not_found() {
        let err = ApiError::from(BookingError::UnknownExperience(ExperienceId::new("ghost")));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "UNKNOWN_EXPERIENCE");
    }

    #[test]
    fn eligibility_maps_to_forbidden_and_timeout_to_408() {
        let err = ApiError::from(BookingError::ContactNotEligible {
            contact: ContactId::new("c1"),
            experience: ExperienceId::new("X"),
        });
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = ApiError::from(BookingError::LockTimeout(key()));
        assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.code(), "TIMEOUT");
    }

    #[test]
    fn collaborator_failures_are_unavailable() {
        let err = ApiError::from(BookingError::Transient("crm down".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "CRM_UNAVAILABLE");
    }
}
