//! Shared type definitions for the SmartBus backend.
//!
//! This crate is the single source of truth for the entities that flow
//! between the stores, the live-location core and the HTTP surface. Types
//! are exported to `TypeScript` via `ts-rs` for map dashboards.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for store-assigned keys
//! - [`structs`] -- Topology and location entities
//! - [`requests`] -- Inbound request payloads

pub mod ids;
pub mod requests;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::{BusId, ReportId, RouteId, StopId};
pub use requests::{AssignRoute, NewBus, NewRoute, NewStop, RawLocationReport};
pub use structs::{Bus, Coordinate, LocationReport, LocationUpdate, Route, RouteDetail, Stop};
