//! Booking server binary.

use openday_core::{
    BookingService, CapacityLedger, CatalogDefinition, CatalogResolver, CoordinatorConfig,
    ExperienceCatalog, InMemoryReservationStore, ReservationCoordinator, ReservationStore,
};
use openday_postgres::{PostgresReservationStore, PostgresStoreConfig};
use openday_web::crm::HttpCrmClient;
use openday_web::notify::{HttpConfirmationSender, LogOnlySender};
use openday_web::{build_router, AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openday=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Open Day booking server");

    let config = Config::from_env();
    info!(
        catalog = %config.booking.catalog_path,
        crm = %config.crm.base_url,
        "configuration loaded"
    );

    // Catalog and resolver aliases come from one definition file.
    let definition_json = tokio::fs::read_to_string(&config.booking.catalog_path).await?;
    let definition = CatalogDefinition::from_json(&definition_json)?;
    let resolver = CatalogResolver::new(definition.aliases.clone());
    let catalog = Arc::new(ExperienceCatalog::new(definition.experiences)?);
    info!(
        experiences = catalog.experience_ids().count(),
        "catalog loaded"
    );

    // Reservation store: Postgres when configured, in-memory otherwise.
    let store: Arc<dyn ReservationStore> = match &config.database.url {
        Some(url) => {
            info!("connecting to reservation database");
            let store = PostgresReservationStore::connect(
                &PostgresStoreConfig {
                    url: url.clone(),
                    max_connections: config.database.max_connections,
                    connect_timeout: Duration::from_secs(config.database.connect_timeout),
                },
                config.booking.duplicate_policy,
            )
            .await?;
            store.migrate().await?;
            info!("reservation database ready");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; reservations are not durable across restarts");
            Arc::new(InMemoryReservationStore::new(
                config.booking.duplicate_policy,
            ))
        }
    };

    let coordinator = Arc::new(ReservationCoordinator::new(
        Arc::clone(&catalog),
        Arc::clone(&store),
        CoordinatorConfig {
            lock_timeout: Duration::from_millis(config.booking.lock_timeout_ms),
        },
    ));
    let ledger = Arc::new(CapacityLedger::new(
        Arc::clone(&catalog),
        Arc::clone(&store),
    ));

    let crm = Arc::new(HttpCrmClient::new(&config.crm)?);
    let notifier: Arc<dyn openday_core::ConfirmationSender> =
        match config.notifications.endpoint.clone() {
            Some(endpoint) => {
                info!(%endpoint, "confirmation webhook configured");
                Arc::new(HttpConfirmationSender::new(
                    endpoint,
                    &config.notifications,
                )?)
            }
            None => {
                warn!("NOTIFY_ENDPOINT not set; confirmations are log-only");
                Arc::new(LogOnlySender)
            }
        };

    let booking = Arc::new(BookingService::new(
        Arc::clone(&catalog),
        resolver,
        coordinator,
        Arc::clone(&ledger),
        crm,
        notifier,
    ));

    openday_web::metrics::register_booking_metrics();

    let state = AppState::new(booking, ledger, catalog, store);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Graceful shutdown on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down gracefully");
        },
    }
}
