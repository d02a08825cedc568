//! `bus_locations` persistence: append and latest-by-bus.
//!
//! Rows are never updated or deleted here. `recorded_at` is assigned by
//! the database and forced strictly past the bus's previous report, so
//! the per-bus order is total even when the clock stalls. Ties from other
//! writers are still broken by `id` on read.

use async_trait::async_trait;
use smartbus_core::{LocationStore, NewLocationReport, StoreError};
use smartbus_types::{BusId, LocationReport, ReportId};
use sqlx::PgPool;

use crate::error::{DbError, Violation, violation};
use crate::postgres::PostgresPool;

/// `PostgreSQL`-backed [`LocationStore`].
#[derive(Debug, Clone)]
pub struct PgLocationStore {
    pool: PgPool,
}

impl PgLocationStore {
    /// Create a store over a shared pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

#[async_trait]
impl LocationStore for PgLocationStore {
    async fn append(&self, report: NewLocationReport) -> Result<LocationReport, StoreError> {
        let row = sqlx::query_as::<_, LocationRow>(
            r"INSERT INTO bus_locations (bus_id, latitude, longitude, speed, recorded_at)
              SELECT $1, $2, $3, $4,
                     GREATEST(
                         clock_timestamp(),
                         COALESCE(MAX(recorded_at) + INTERVAL '1 microsecond', clock_timestamp())
                     )
              FROM bus_locations
              WHERE bus_id = $1
              RETURNING id, bus_id, latitude, longitude, speed, recorded_at",
        )
        .bind(report.bus_id.into_inner())
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(report.speed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violation(&e) {
            Violation::ForeignKey => StoreError::UnknownBus(report.bus_id),
            _ => DbError::from(e).into(),
        })?;

        tracing::debug!(bus_id = %report.bus_id, id = row.id, "Inserted location report");
        Ok(row.into())
    }

    async fn latest(&self, bus_id: BusId) -> Result<Option<LocationReport>, StoreError> {
        let row = sqlx::query_as::<_, LocationRow>(
            r"SELECT id, bus_id, latitude, longitude, speed, recorded_at
              FROM bus_locations
              WHERE bus_id = $1
              ORDER BY recorded_at DESC, id DESC
              LIMIT 1",
        )
        .bind(bus_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(row.map(Into::into))
    }
}

/// A row from the `bus_locations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LocationRow {
    /// Serial id.
    pub id: i64,
    /// Reporting bus.
    pub bus_id: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Ground speed.
    pub speed: f64,
    /// Database-assigned timestamp.
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl From<LocationRow> for LocationReport {
    fn from(row: LocationRow) -> Self {
        Self {
            id: ReportId::new(row.id),
            bus_id: BusId::new(row.bus_id),
            latitude: row.latitude,
            longitude: row.longitude,
            speed: row.speed,
            recorded_at: row.recorded_at,
        }
    }
}
