//! Open Day booking server.
//!
//! Thin Axum surface over [`openday_core`]: the booking endpoint, catalog
//! and availability queries, and the administrative reset/snapshot
//! operations, with the engine's typed outcomes mapped to stable error
//! codes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod crm;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
