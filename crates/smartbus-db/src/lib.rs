//! `PostgreSQL` data layer for the SmartBus backend.
//!
//! Implements the core's storage seams over one shared connection pool:
//!
//! ```text
//! PostgresPool
//!     |-- PgLocationStore  (bus_locations: append, latest by bus)
//!     +-- PgTopologyStore  (buses, routes, stops)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- Pool bring-up, migrations and schema check
//! - [`location_store`] -- Append-only location history
//! - [`topology_store`] -- Bus/route/stop registry
//! - [`error`] -- Shared error types

pub mod error;
pub mod location_store;
pub mod postgres;
pub mod topology_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use location_store::{LocationRow, PgLocationStore};
pub use postgres::{LATEST_INDEX, PostgresPool};
pub use topology_store::{BusRow, PgTopologyStore, RouteRow, StopRow};
