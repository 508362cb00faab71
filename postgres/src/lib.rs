//! PostgreSQL-backed reservation store.
//!
//! Implements [`ReservationStore`] over a `reservations` table. The
//! duplicate policy stays runtime-configurable, so it is enforced with a
//! guarded `INSERT ... WHERE NOT EXISTS` (one atomic statement) rather than
//! a fixed unique index; a unique violation from an operator-added index is
//! still mapped to the duplicate outcome.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use openday_core::{
    ContactId, DuplicatePolicy, ExperienceId, NewReservation, Reservation, ReservationFilter,
    ReservationId, ReservationStore, SlotId, SlotKey, StoreError,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{QueryBuilder, Row};
use std::time::Duration;
use uuid::Uuid;

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Connection settings for the reservation database.
#[derive(Clone, Debug)]
pub struct PostgresStoreConfig {
    /// Connection URL.
    pub url: String,
    /// Pool size ceiling.
    pub max_connections: u32,
    /// Connect/acquire timeout.
    pub connect_timeout: Duration,
}

/// Reservation store backed by PostgreSQL.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
    policy: DuplicatePolicy,
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    contact_id: String,
    experience_id: String,
    slot_id: String,
    created_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            id: ReservationId::from_uuid(row.id),
            contact_id: ContactId::new(row.contact_id),
            key: SlotKey::new(
                ExperienceId::new(row.experience_id),
                SlotId::new(row.slot_id),
            ),
            created_at: row.created_at,
        }
    }
}

impl PostgresReservationStore {
    /// Connects a pool and wraps it with the given duplicate policy.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx` error when the pool cannot be
    /// established.
    pub async fn connect(
        config: &PostgresStoreConfig,
        policy: DuplicatePolicy,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await?;
        Ok(Self::from_pool(pool, policy))
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool, policy: DuplicatePolicy) -> Self {
        Self { pool, policy }
    }

    /// Runs the crate's migrations.
    ///
    /// # Errors
    ///
    /// Returns the migration error from `sqlx`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// The underlying pool, for health checks.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn io(err: sqlx::Error) -> StoreError {
        StoreError::Io(err.to_string())
    }

    fn is_unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION)
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    #[tracing::instrument(skip(self), fields(contact = %new.contact_id, key = %new.key))]
    async fn create(&self, new: NewReservation) -> Result<Reservation, StoreError> {
        let reservation = Reservation {
            id: ReservationId::new(),
            contact_id: new.contact_id,
            key: new.key,
            created_at: Utc::now(),
        };

        // One atomic statement: insert only when the policy finds no
        // conflicting row.
        let guard = match self.policy {
            DuplicatePolicy::PerExperience => {
                "WHERE NOT EXISTS (SELECT 1 FROM reservations \
                 WHERE contact_id = $2 AND experience_id = $3)"
            }
            DuplicatePolicy::PerSlot => {
                "WHERE NOT EXISTS (SELECT 1 FROM reservations \
                 WHERE contact_id = $2 AND experience_id = $3 AND slot_id = $4)"
            }
            DuplicatePolicy::Disabled => "",
        };
        let sql = format!(
            "INSERT INTO reservations (id, contact_id, experience_id, slot_id, created_at) \
             SELECT $1, $2, $3, $4, $5 {guard}"
        );

        let result = sqlx::query(&sql)
            .bind(reservation.id.as_uuid())
            .bind(reservation.contact_id.as_str())
            .bind(reservation.key.experience_id.as_str())
            .bind(reservation.key.slot_id.as_str())
            .bind(reservation.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if Self::is_unique_violation(&e) {
                    StoreError::Duplicate {
                        contact: reservation.contact_id.clone(),
                        experience: reservation.key.experience_id.clone(),
                    }
                } else {
                    Self::io(e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate {
                contact: reservation.contact_id,
                experience: reservation.key.experience_id,
            });
        }
        Ok(reservation)
    }

    async fn find_conflict(
        &self,
        contact_id: &ContactId,
        key: &SlotKey,
    ) -> Result<Option<Reservation>, StoreError> {
        let sql = match self.policy {
            DuplicatePolicy::PerExperience => {
                "SELECT id, contact_id, experience_id, slot_id, created_at \
                 FROM reservations WHERE contact_id = $1 AND experience_id = $2 LIMIT 1"
            }
            DuplicatePolicy::PerSlot => {
                "SELECT id, contact_id, experience_id, slot_id, created_at \
                 FROM reservations \
                 WHERE contact_id = $1 AND experience_id = $2 AND slot_id = $3 LIMIT 1"
            }
            DuplicatePolicy::Disabled => return Ok(None),
        };

        let mut query = sqlx::query_as::<_, ReservationRow>(sql)
            .bind(contact_id.as_str())
            .bind(key.experience_id.as_str());
        if self.policy == DuplicatePolicy::PerSlot {
            query = query.bind(key.slot_id.as_str());
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::io)?;
        Ok(row.map(Reservation::from))
    }

    async fn count_by_key(&self, key: &SlotKey) -> Result<u32, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM reservations \
             WHERE experience_id = $1 AND slot_id = $2",
        )
        .bind(key.experience_id.as_str())
        .bind(key.slot_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(Self::io)?;

        let count: i64 = row.try_get("count").map_err(Self::io)?;
        u32::try_from(count).map_err(|_| StoreError::Io("reservation count overflow".into()))
    }

    async fn list(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, StoreError> {
        let mut builder = QueryBuilder::new(
            "SELECT id, contact_id, experience_id, slot_id, created_at FROM reservations",
        );
        let mut separator = " WHERE ";
        if let Some(contact_id) = &filter.contact_id {
            builder.push(separator).push("contact_id = ");
            builder.push_bind(contact_id.as_str());
            separator = " AND ";
        }
        if let Some(experience_id) = &filter.experience_id {
            builder.push(separator).push("experience_id = ");
            builder.push_bind(experience_id.as_str());
        }
        builder.push(" ORDER BY created_at DESC");

        let rows: Vec<ReservationRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(Self::io)?;
        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reservations")
            .execute(&self.pool)
            .await
            .map_err(Self::io)?;
        Ok(result.rows_affected())
    }
}
