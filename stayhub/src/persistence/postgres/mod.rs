//! `PostgreSQL` storage backend.
//!
//! Runtime-checked `sqlx` queries over the schema in `migrations/`. Booking
//! writes run in a transaction that locks the listing row before re-checking
//! overlap or capacity; room stays are also guarded by the
//! `bookings_room_no_overlap` exclusion constraint.

mod bookings;
mod catalog;
mod listings;
mod media;
mod users;
mod wishlists;

use super::{StoreError, StoreHealth, StoreResult};
use crate::config::StorageConfig;
use crate::types::Listing;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// SQLSTATE of an exclusion constraint violation.
const EXCLUSION_VIOLATION: &str = "23P01";

/// Storage backend over a `PostgreSQL` connection pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool as configured.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] if no connection can be established.
    pub async fn connect(config: &StorageConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a driver error, recognising the constraint violations the schema raises.
fn db_error(context: &str, error: &sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = error {
        if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) {
            return StoreError::DateOverlap;
        }
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("users_username_key") => "username",
                Some("videos_experience_id_key") => "experience",
                _ => "value",
            };
            return StoreError::Duplicate { field };
        }
    }
    StoreError::Database(format!("{context}: {error}"))
}

/// Map a driver error with context.
fn failed(context: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |error| db_error(context, &error)
}

/// `NotFound` unless a delete or update touched a row.
fn touched(rows: u64, resource: &'static str, pk: i64) -> StoreResult<()> {
    if rows == 0 {
        return Err(StoreError::not_found(resource, pk));
    }
    Ok(())
}

/// Column holding the listing key and the key itself.
const fn listing_column(listing: Listing) -> (&'static str, i64) {
    match listing {
        Listing::Room(pk) => ("room_id", pk.get()),
        Listing::Experience(pk) => ("experience_id", pk.get()),
    }
}

/// Parse a stored enum value.
fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(StoreError::Database)
}

#[async_trait]
impl StoreHealth for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(failed("Failed to ping database"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExperienceId, RoomId};

    #[test]
    fn test_listing_column() {
        assert_eq!(listing_column(Listing::Room(RoomId::new(3))), ("room_id", 3));
        assert_eq!(
            listing_column(Listing::Experience(ExperienceId::new(4))),
            ("experience_id", 4)
        );
    }

    #[test]
    fn test_non_database_errors_keep_context() {
        let error = db_error("Failed to load room", &sqlx::Error::RowNotFound);
        assert!(matches!(error, StoreError::Database(msg) if msg.starts_with("Failed to load room")));
    }
}
