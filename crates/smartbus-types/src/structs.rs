//! Core entity structs for the SmartBus backend.
//!
//! Covers the static topology (`Bus`, `Route`, `Stop`), the persisted
//! `LocationReport`, and the `LocationUpdate` pushed to live subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{BusId, ReportId, RouteId, StopId};

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// A registered bus.
///
/// `route_id` is the current assignment. Reassignment overwrites it; no
/// history of earlier assignments is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bus {
    /// Store-assigned identifier.
    pub id: BusId,
    /// Fleet number painted on the vehicle.
    pub bus_number: String,
    /// Name of the assigned driver.
    pub driver_name: String,
    /// Route the bus is currently assigned to, if any.
    pub route_id: Option<RouteId>,
    /// When the bus was registered.
    pub created_at: DateTime<Utc>,
}

/// A fixed route served by the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Route {
    /// Store-assigned identifier.
    pub id: RouteId,
    /// Display name.
    pub route_name: String,
    /// Descriptive origin.
    pub start_location: String,
    /// Descriptive terminus.
    pub end_location: String,
    /// When the route was created.
    pub created_at: DateTime<Utc>,
}

/// A stop belonging to exactly one route.
///
/// `stop_order` is unique within the route and defines traversal sequence.
/// Values need not be contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Stop {
    /// Store-assigned identifier.
    pub id: StopId,
    /// Owning route.
    pub route_id: RouteId,
    /// Display name.
    pub stop_name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Position of the stop along the route.
    pub stop_order: i32,
    /// When the stop was created.
    pub created_at: DateTime<Utc>,
}

/// A route together with its stops sorted by `stop_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RouteDetail {
    /// The route record.
    pub route: Route,
    /// Stops in ascending `stop_order`.
    pub stops: Vec<Stop>,
}

// ---------------------------------------------------------------------------
// Live location
// ---------------------------------------------------------------------------

/// One immutable GPS + speed observation, as persisted.
///
/// `recorded_at` is assigned by the store at persistence time. Reports for
/// a single bus are totally ordered by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LocationReport {
    /// Store-assigned identifier.
    pub id: ReportId,
    /// The reporting bus.
    pub bus_id: BusId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Ground speed, never negative.
    pub speed: f64,
    /// Server timestamp assigned when the report was stored.
    pub recorded_at: DateTime<Utc>,
}

impl LocationReport {
    /// Project the report onto the payload pushed to live subscribers.
    pub const fn to_update(&self) -> LocationUpdate {
        LocationUpdate {
            bus_id: self.bus_id,
            latitude: self.latitude,
            longitude: self.longitude,
            speed: self.speed,
        }
    }
}

/// Payload of a `busLocationUpdate` event on the live stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LocationUpdate {
    /// The reporting bus.
    pub bus_id: BusId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Ground speed.
    pub speed: f64,
}

/// A vertex of a route polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}
