//! Bus, route and stop registry over `PostgreSQL`.
//!
//! Reassigning a bus overwrites `buses.route_id`; no assignment history is
//! kept. Stops come back ordered by `stop_order`, which the
//! `stops_route_order_unique` constraint keeps unique per route.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use smartbus_core::{StoreError, TopologyLookup, TopologyRegistry};
use smartbus_types::{
    Bus, BusId, NewBus, NewRoute, NewStop, Route, RouteDetail, RouteId, Stop, StopId,
};
use sqlx::PgPool;

use crate::error::{DbError, Violation, violation};
use crate::postgres::PostgresPool;

const BUS_COLUMNS: &str = "id, bus_number, driver_name, route_id, created_at";
const ROUTE_COLUMNS: &str = "id, route_name, start_location, end_location, created_at";
const STOP_COLUMNS: &str =
    "id, route_id, stop_name, latitude, longitude, stop_order, created_at";

/// `PostgreSQL`-backed [`TopologyRegistry`].
#[derive(Debug, Clone)]
pub struct PgTopologyStore {
    pool: PgPool,
}

impl PgTopologyStore {
    /// Create a registry over a shared pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }

    async fn route(&self, route_id: RouteId) -> Result<Option<Route>, DbError> {
        let row = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1"
        ))
        .bind(route_id.into_inner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl TopologyLookup for PgTopologyStore {
    async fn bus(&self, bus_id: BusId) -> Result<Option<Bus>, StoreError> {
        let row = sqlx::query_as::<_, BusRow>(&format!(
            "SELECT {BUS_COLUMNS} FROM buses WHERE id = $1"
        ))
        .bind(bus_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(row.map(Into::into))
    }

    async fn route_detail(&self, route_id: RouteId) -> Result<Option<RouteDetail>, StoreError> {
        let Some(route) = self.route(route_id).await? else {
            return Ok(None);
        };

        let stops = sqlx::query_as::<_, StopRow>(&format!(
            "SELECT {STOP_COLUMNS} FROM stops WHERE route_id = $1 ORDER BY stop_order, id"
        ))
        .bind(route_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?
        .into_iter()
        .map(Into::into)
        .collect();

        Ok(Some(RouteDetail { route, stops }))
    }
}

#[async_trait]
impl TopologyRegistry for PgTopologyStore {
    async fn register_bus(&self, bus: NewBus) -> Result<Bus, StoreError> {
        let row = sqlx::query_as::<_, BusRow>(&format!(
            "INSERT INTO buses (bus_number, driver_name) VALUES ($1, $2) RETURNING {BUS_COLUMNS}"
        ))
        .bind(&bus.bus_number)
        .bind(&bus.driver_name)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        tracing::debug!(bus_id = row.id, bus_number = %row.bus_number, "Registered bus");
        Ok(row.into())
    }

    async fn list_buses(&self) -> Result<Vec<Bus>, StoreError> {
        let rows = sqlx::query_as::<_, BusRow>(&format!(
            "SELECT {BUS_COLUMNS} FROM buses ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_route(&self, route: NewRoute) -> Result<Route, StoreError> {
        let row = sqlx::query_as::<_, RouteRow>(&format!(
            "INSERT INTO routes (route_name, start_location, end_location)
             VALUES ($1, $2, $3) RETURNING {ROUTE_COLUMNS}"
        ))
        .bind(&route.route_name)
        .bind(&route.start_location)
        .bind(&route.end_location)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        tracing::debug!(route_id = row.id, route_name = %row.route_name, "Created route");
        Ok(row.into())
    }

    async fn list_routes(&self) -> Result<Vec<Route>, StoreError> {
        let rows = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {ROUTE_COLUMNS} FROM routes ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add_stop(&self, route_id: RouteId, stop: NewStop) -> Result<Stop, StoreError> {
        let row = sqlx::query_as::<_, StopRow>(&format!(
            "INSERT INTO stops (route_id, stop_name, latitude, longitude, stop_order)
             VALUES ($1, $2, $3, $4, $5) RETURNING {STOP_COLUMNS}"
        ))
        .bind(route_id.into_inner())
        .bind(&stop.stop_name)
        .bind(stop.latitude)
        .bind(stop.longitude)
        .bind(stop.stop_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violation(&e) {
            Violation::ForeignKey => StoreError::UnknownRoute(route_id),
            Violation::Unique => StoreError::DuplicateStopOrder {
                route_id,
                stop_order: stop.stop_order,
            },
            Violation::None => DbError::from(e).into(),
        })?;

        tracing::debug!(route_id = %route_id, stop_order = row.stop_order, "Added stop");
        Ok(row.into())
    }

    async fn assign_route(&self, bus_id: BusId, route_id: RouteId) -> Result<Bus, StoreError> {
        let row = sqlx::query_as::<_, BusRow>(&format!(
            "UPDATE buses SET route_id = $2 WHERE id = $1 RETURNING {BUS_COLUMNS}"
        ))
        .bind(bus_id.into_inner())
        .bind(route_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match violation(&e) {
            Violation::ForeignKey => StoreError::UnknownRoute(route_id),
            _ => DbError::from(e).into(),
        })?;

        let bus = row.ok_or(StoreError::UnknownBus(bus_id))?;
        tracing::debug!(bus_id = %bus_id, route_id = %route_id, "Assigned bus to route");
        Ok(bus.into())
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from the `buses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusRow {
    /// Serial id.
    pub id: i64,
    /// Fleet number.
    pub bus_number: String,
    /// Driver name.
    pub driver_name: String,
    /// Current route assignment.
    pub route_id: Option<i64>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl From<BusRow> for Bus {
    fn from(row: BusRow) -> Self {
        Self {
            id: BusId::new(row.id),
            bus_number: row.bus_number,
            driver_name: row.driver_name,
            route_id: row.route_id.map(RouteId::new),
            created_at: row.created_at,
        }
    }
}

/// A row from the `routes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RouteRow {
    /// Serial id.
    pub id: i64,
    /// Display name.
    pub route_name: String,
    /// Descriptive origin.
    pub start_location: String,
    /// Descriptive terminus.
    pub end_location: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Self {
            id: RouteId::new(row.id),
            route_name: row.route_name,
            start_location: row.start_location,
            end_location: row.end_location,
            created_at: row.created_at,
        }
    }
}

/// A row from the `stops` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StopRow {
    /// Serial id.
    pub id: i64,
    /// Owning route.
    pub route_id: i64,
    /// Display name.
    pub stop_name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Position along the route.
    pub stop_order: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<StopRow> for Stop {
    fn from(row: StopRow) -> Self {
        Self {
            id: StopId::new(row.id),
            route_id: RouteId::new(row.route_id),
            stop_name: row.stop_name,
            latitude: row.latitude,
            longitude: row.longitude,
            stop_order: row.stop_order,
            created_at: row.created_at,
        }
    }
}
