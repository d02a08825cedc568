//! Axum router construction for the SmartBus API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for browser dashboards.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the SmartBus server.
///
/// The router includes:
/// - `GET /` -- liveness string
/// - `GET /ws` -- `WebSocket` live location stream
/// - `POST /api/bus/register`, `GET /api/buses`
/// - `POST /api/bus/location`, `GET /api/bus/{id}/location`
/// - `POST /api/bus/{id}/assign-route`
/// - `POST /api/routes`, `GET /api/routes`, `GET /api/routes/{id}`
/// - `POST /api/routes/{id}/stops`
///
/// CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_live))
        // Buses
        .route("/api/bus/register", post(handlers::register_bus))
        .route("/api/bus/location", post(handlers::post_location))
        .route("/api/bus/{id}/location", get(handlers::get_bus_location))
        .route("/api/bus/{id}/assign-route", post(handlers::assign_route))
        .route("/api/buses", get(handlers::list_buses))
        // Routes and stops
        .route(
            "/api/routes",
            get(handlers::list_routes).post(handlers::create_route),
        )
        .route("/api/routes/{id}", get(handlers::get_route))
        .route("/api/routes/{id}/stops", post(handlers::add_stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
