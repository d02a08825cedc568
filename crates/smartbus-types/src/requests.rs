//! Inbound request payloads.
//!
//! Registration payloads are strongly typed. The location report is kept
//! loosely typed ([`RawLocationReport`]) so that missing or non-numeric
//! fields surface as validation errors from the ingestion path instead of
//! generic body-parse failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::ids::RouteId;

/// Body of `POST /api/bus/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewBus {
    /// Fleet number.
    pub bus_number: String,
    /// Driver name.
    pub driver_name: String,
}

/// Body of `POST /api/routes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewRoute {
    /// Display name.
    pub route_name: String,
    /// Descriptive origin.
    pub start_location: String,
    /// Descriptive terminus.
    pub end_location: String,
}

/// Body of `POST /api/routes/:routeId/stops`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewStop {
    /// Display name.
    pub stop_name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Position along the route, unique within it.
    pub stop_order: i32,
}

/// Body of `POST /api/bus/:id/assign-route`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AssignRoute {
    /// The route to assign.
    pub route_id: RouteId,
}

/// Body of `POST /api/bus/location` before validation.
///
/// Every field is optional and untyped; validation turns this into a
/// well-formed report or a field-level error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RawLocationReport {
    /// Reporting bus id.
    #[serde(default)]
    pub bus_id: Option<Value>,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: Option<Value>,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: Option<Value>,
    /// Ground speed.
    #[serde(default)]
    pub speed: Option<Value>,
}
