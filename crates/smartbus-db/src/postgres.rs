//! Database bring-up for the SmartBus stores.
//!
//! One pool backs both [`PgLocationStore`] and [`PgTopologyStore`]. It is
//! opened from the `database` section of the configuration, the embedded
//! migrations are applied when that section asks for it, and the schema is
//! then checked for the latest-position index that
//! [`PgLocationStore::latest`](smartbus_core::LocationStore::latest) reads
//! through. A database missing that index is refused at startup.

use std::time::Duration;

use smartbus_core::config::DatabaseSection;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;

use crate::error::DbError;
use crate::location_store::PgLocationStore;
use crate::topology_store::PgTopologyStore;

/// Index serving "latest report for a bus".
pub const LATEST_INDEX: &str = "bus_locations_latest_idx";

/// Pool limits taken from the `database` section. A zero pool size is
/// raised to one connection.
pub(crate) fn pool_options(section: &DatabaseSection) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(section.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(section.connect_timeout_secs))
}

/// Shared `PostgreSQL` pool for the location and topology stores.
#[derive(Debug, Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Connect to `url`, migrate if configured, and check the schema.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] for an unparseable URL,
    /// [`DbError::Postgres`] if the connection fails,
    /// [`DbError::Migration`] if a migration fails, and
    /// [`DbError::MissingIndex`] if the schema lacks [`LATEST_INDEX`].
    pub async fn open(url: &str, section: &DatabaseSection) -> Result<Self, DbError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("invalid database URL: {e}")))?;
        let db = Self {
            pool: pool_options(section).connect_with(options).await?,
        };

        if section.run_migrations {
            db.migrate().await?;
        }
        db.check_schema().await?;

        info!(
            max_connections = section.max_connections,
            migrated = section.run_migrations,
            "PostgreSQL ready"
        );
        Ok(db)
    }

    /// Apply the embedded `routes`/`buses`/`stops`/`bus_locations` migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if any migration fails.
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Confirm `bus_locations` carries [`LATEST_INDEX`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::MissingIndex`] when it does not, or
    /// [`DbError::Postgres`] if the catalog cannot be read.
    pub async fn check_schema(&self) -> Result<(), DbError> {
        let present: bool = sqlx::query_scalar(
            r"SELECT EXISTS (
                  SELECT 1 FROM pg_indexes
                  WHERE tablename = 'bus_locations' AND indexname = $1
              )",
        )
        .bind(LATEST_INDEX)
        .fetch_one(&self.pool)
        .await?;

        if present {
            Ok(())
        } else {
            Err(DbError::MissingIndex(LATEST_INDEX))
        }
    }

    /// Location history store over this pool.
    pub fn location_store(&self) -> PgLocationStore {
        PgLocationStore::new(self)
    }

    /// Bus/route/stop registry over this pool.
    pub fn topology_store(&self) -> PgTopologyStore {
        PgTopologyStore::new(self)
    }

    pub(crate) const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Wait for in-flight queries, then close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_limits_follow_the_database_section() {
        let section = DatabaseSection {
            max_connections: 3,
            connect_timeout_secs: 2,
            ..DatabaseSection::default()
        };
        let options = pool_options(&section);
        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn zero_pool_size_is_raised_to_one() {
        let section = DatabaseSection {
            max_connections: 0,
            ..DatabaseSection::default()
        };
        assert_eq!(pool_options(&section).get_max_connections(), 1);
    }

    #[tokio::test]
    async fn malformed_url_is_a_config_error() {
        let err = PostgresPool::open("not a url", &DatabaseSection::default())
            .await
            .err();
        assert!(matches!(err, Some(DbError::Config(_))));
    }
}
