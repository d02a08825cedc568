//! Storage seams consumed by the core.
//!
//! The core never talks to a database directly. It sees two narrow
//! interfaces:
//!
//! - [`LocationStore`] -- durable append of location reports plus a
//!   "latest by bus" query
//! - [`TopologyLookup`] -- bus -> route -> ordered stops
//!
//! [`TopologyRegistry`] extends the lookup with the registration writes
//! used by the HTTP surface. Implementations live in [`crate::memory`]
//! (in-process, used for development and tests) and in `smartbus-db`
//! (`PostgreSQL`).

use async_trait::async_trait;
use smartbus_types::{
    Bus, BusId, LocationReport, NewBus, NewRoute, NewStop, Route, RouteDetail, RouteId, Stop,
};

use crate::error::StoreError;

/// A validated report ready to be persisted.
///
/// The store assigns `id` and `recorded_at`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewLocationReport {
    /// The reporting bus.
    pub bus_id: BusId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Ground speed, never negative.
    pub speed: f64,
}

/// Durable, append-only record of location reports.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Persist a new report and return it with its server-assigned
    /// identifier and `recorded_at`.
    ///
    /// `recorded_at` must be strictly greater than that of any earlier
    /// report for the same bus in this store.
    async fn append(&self, report: NewLocationReport) -> Result<LocationReport, StoreError>;

    /// Return the report with the greatest `recorded_at` for `bus_id`, or
    /// `None` when the bus has no reports.
    async fn latest(&self, bus_id: BusId) -> Result<Option<LocationReport>, StoreError>;
}

/// Read-only view of the static topology.
#[async_trait]
pub trait TopologyLookup: Send + Sync {
    /// Fetch a bus by id.
    async fn bus(&self, bus_id: BusId) -> Result<Option<Bus>, StoreError>;

    /// The route a bus is currently assigned to.
    ///
    /// Returns `None` both for an unassigned bus and for an unknown bus.
    async fn route_for_bus(&self, bus_id: BusId) -> Result<Option<RouteId>, StoreError> {
        Ok(self.bus(bus_id).await?.and_then(|bus| bus.route_id))
    }

    /// Fetch a route with its stops sorted by ascending `stop_order`.
    async fn route_detail(&self, route_id: RouteId) -> Result<Option<RouteDetail>, StoreError>;
}

/// Registration writes layered over [`TopologyLookup`].
#[async_trait]
pub trait TopologyRegistry: TopologyLookup {
    /// Register a new bus with no route assignment.
    async fn register_bus(&self, bus: NewBus) -> Result<Bus, StoreError>;

    /// List every registered bus ordered by id.
    async fn list_buses(&self) -> Result<Vec<Bus>, StoreError>;

    /// Create a new route with no stops.
    async fn create_route(&self, route: NewRoute) -> Result<Route, StoreError>;

    /// List every route ordered by id.
    async fn list_routes(&self) -> Result<Vec<Route>, StoreError>;

    /// Add a stop to an existing route.
    ///
    /// Fails with [`StoreError::UnknownRoute`] or
    /// [`StoreError::DuplicateStopOrder`].
    async fn add_stop(&self, route_id: RouteId, stop: NewStop) -> Result<Stop, StoreError>;

    /// Point a bus at a route, overwriting any earlier assignment.
    async fn assign_route(&self, bus_id: BusId, route_id: RouteId) -> Result<Bus, StoreError>;
}
