//! REST API endpoint handlers.
//!
//! Handlers are thin: they parse the request, call one core service from
//! [`AppState`] and shape the JSON reply. Every failure goes through
//! [`ApiError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Liveness string |
//! | `POST` | `/api/bus/register` | Register a bus |
//! | `POST` | `/api/bus/location` | Ingest a location report |
//! | `GET` | `/api/bus/{id}/location` | Latest report for a bus |
//! | `POST` | `/api/bus/{id}/assign-route` | Assign a bus to a route |
//! | `GET` | `/api/buses` | List buses |
//! | `POST` | `/api/routes` | Create a route |
//! | `GET` | `/api/routes` | List routes |
//! | `GET` | `/api/routes/{id}` | Route with its ordered stops |
//! | `POST` | `/api/routes/{id}/stops` | Add a stop to a route |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use smartbus_core::validate;
use smartbus_types::{
    AssignRoute, Bus, BusId, NewBus, NewRoute, NewStop, RawLocationReport, Route, RouteId, Stop,
};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Body returned when a bus has never reported.
const NO_LOCATION: &str = "No location data found";

/// Body returned when a route id is unknown.
const ROUTE_NOT_FOUND: &str = "Route not found";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn parse_bus_id(raw: &str) -> Result<BusId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::InvalidId(format!("bus id {raw:?}: {e}")))
}

fn parse_route_id(raw: &str) -> Result<RouteId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::InvalidId(format!("route id {raw:?}: {e}")))
}

fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Plain-text liveness check.
pub async fn index() -> &'static str {
    "SmartBus Backend Running"
}

// ---------------------------------------------------------------------------
// Buses
// ---------------------------------------------------------------------------

/// Register a new bus and return the created record.
pub async fn register_bus(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewBus>, JsonRejection>,
) -> Result<Json<Bus>, ApiError> {
    let Json(new_bus) = payload?;
    validate::new_bus(&new_bus)?;
    let bus = state.registry.register_bus(new_bus).await?;
    info!(bus_id = %bus.id, bus_number = %bus.bus_number, "Bus registered");
    Ok(Json(bus))
}

/// List every registered bus.
pub async fn list_buses(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Bus>>, ApiError> {
    Ok(Json(state.registry.list_buses().await?))
}

/// Ingest a GPS report from a device.
///
/// On success the report is durable and has been handed to the hub.
pub async fn post_location(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawLocationReport>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(raw) = payload?;
    state.ingestor.ingest(&raw).await?;
    Ok(message("Location updated successfully"))
}

/// Latest known position of a bus.
///
/// A bus that has never reported is not an error.
pub async fn get_bus_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let bus_id = parse_bus_id(&id)?;
    let response = match state.snapshot.latest(bus_id).await? {
        Some(report) => Json(report).into_response(),
        None => message(NO_LOCATION).into_response(),
    };
    Ok(response)
}

/// Point a bus at a route, replacing any previous assignment.
pub async fn assign_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<AssignRoute>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bus_id = parse_bus_id(&id)?;
    let Json(AssignRoute { route_id }) = payload?;
    state.registry.assign_route(bus_id, route_id).await?;
    info!(%bus_id, %route_id, "Bus assigned to route");
    Ok(message("Bus assigned to route successfully"))
}

// ---------------------------------------------------------------------------
// Routes and stops
// ---------------------------------------------------------------------------

/// Create a route and return the created record.
pub async fn create_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewRoute>, JsonRejection>,
) -> Result<Json<Route>, ApiError> {
    let Json(new_route) = payload?;
    validate::new_route(&new_route)?;
    let route = state.registry.create_route(new_route).await?;
    info!(route_id = %route.id, route_name = %route.route_name, "Route created");
    Ok(Json(route))
}

/// List every route.
pub async fn list_routes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Route>>, ApiError> {
    Ok(Json(state.registry.list_routes().await?))
}

/// A route together with its stops in `stop_order`.
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let route_id = parse_route_id(&id)?;
    let response = match state.registry.route_detail(route_id).await? {
        Some(detail) => Json(detail).into_response(),
        None => (StatusCode::NOT_FOUND, message(ROUTE_NOT_FOUND)).into_response(),
    };
    Ok(response)
}

/// Add a stop to a route and return the created record.
pub async fn add_stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<NewStop>, JsonRejection>,
) -> Result<Json<Stop>, ApiError> {
    let route_id = parse_route_id(&id)?;
    let Json(new_stop) = payload?;
    validate::new_stop(&new_stop)?;
    let stop = state.registry.add_stop(route_id, new_stop).await?;
    info!(%route_id, stop_id = %stop.id, stop_order = stop.stop_order, "Stop added");
    Ok(Json(stop))
}
