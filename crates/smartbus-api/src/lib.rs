//! HTTP API and live stream for the SmartBus backend.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for registering buses, routes and stops, for
//!   device location reports, and for latest-position queries
//! - **`WebSocket` endpoint** (`/ws`) pushing a `busLocationUpdate` frame
//!   for every accepted report
//! - **Liveness string** at `GET /`
//!
//! # Architecture
//!
//! Handlers call into `smartbus-core` through [`AppState`]. Location
//! reports go through the core ingestor, so the HTTP path and the
//! simulator share the same persist-then-publish guarantees. Each
//! `WebSocket` connection is a task draining its own hub subscription
//! with a bounded send timeout.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, DEFAULT_SEND_TIMEOUT};
