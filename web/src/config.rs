//! Configuration management for the booking server.
//!
//! Loads configuration from environment variables with sensible defaults.

use openday_core::DuplicatePolicy;
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Reservation database configuration.
    pub database: DatabaseConfig,
    /// CRM collaborator configuration.
    pub crm: CrmConfig,
    /// Notification collaborator configuration.
    pub notifications: NotifyConfig,
    /// Booking policy configuration.
    pub booking: BookingConfig,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Graceful shutdown timeout in seconds.
    pub shutdown_timeout: u64,
}

/// Reservation database configuration.
///
/// Without a `DATABASE_URL` the server falls back to the in-memory store -
/// fine for rehearsals, non-durable across restarts.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL; in-memory store when unset.
    pub url: Option<String>,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout in seconds.
    pub connect_timeout: u64,
}

/// CRM collaborator configuration.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// Base URL of the CRM gateway.
    pub base_url: String,
    /// Bearer token, if the gateway requires one.
    pub auth_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout: u64,
}

/// Notification collaborator configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Confirmation sink endpoint; log-only delivery when unset.
    pub endpoint: Option<String>,
    /// Request timeout in seconds.
    pub timeout: u64,
}

/// Booking policy configuration.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Path to the catalog definition JSON file.
    pub catalog_path: String,
    /// Duplicate reservation policy.
    pub duplicate_policy: DuplicatePolicy,
    /// Bound on the per-slot lock wait, in milliseconds.
    pub lock_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                shutdown_timeout: env::var("SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                connect_timeout: env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            crm: CrmConfig {
                base_url: env::var("CRM_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8081/crm".to_string()),
                auth_token: env::var("CRM_AUTH_TOKEN").ok(),
                timeout: env::var("CRM_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            notifications: NotifyConfig {
                endpoint: env::var("NOTIFY_ENDPOINT").ok(),
                timeout: env::var("NOTIFY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            booking: BookingConfig {
                catalog_path: env::var("CATALOG_PATH")
                    .unwrap_or_else(|_| "catalog.json".to_string()),
                duplicate_policy: env::var("BOOKING_DUPLICATE_POLICY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                lock_timeout_ms: env::var("BOOKING_LOCK_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5000),
            },
        }
    }
}
