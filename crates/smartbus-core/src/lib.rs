//! Live-location core for the SmartBus backend.
//!
//! This crate turns GPS reports from buses into durable history and a
//! live push stream:
//!
//! ```text
//! device / simulator
//!     |
//!     +-- Ingestor ----------> LocationStore (append, server timestamp)
//!     |       |
//!     |       +-- on success -> BroadcastHub --> Subscription (one per viewer)
//!     |
//!     +-- SnapshotQuery -----> LocationStore (latest by bus)
//! ```
//!
//! Storage is reached only through the traits in [`store`]. The in-memory
//! implementations in [`memory`] back development runs and tests;
//! `smartbus-db` provides the `PostgreSQL` ones.
//!
//! # Modules
//!
//! - [`hub`] -- Subscriber set and non-blocking fan-out
//! - [`ingest`] -- Validate, persist, publish
//! - [`snapshot`] -- Latest known position per bus
//! - [`simulator`] -- Synthetic bus for development
//! - [`store`] -- Location Store and Topology Lookup seams
//! - [`memory`] -- In-process store implementations
//! - [`validate`] -- Inbound payload checks
//! - [`config`] -- YAML + environment configuration
//! - [`error`] -- Error taxonomy

pub mod config;
pub mod error;
pub mod hub;
pub mod ingest;
pub mod memory;
pub mod simulator;
pub mod snapshot;
pub mod store;
pub mod validate;

// Re-export primary types for convenience.
pub use config::{ConfigError, SmartBusConfig};
pub use error::{IngestError, StoreError, ValidationError};
pub use hub::{BroadcastHub, PublishReport, SubscriberId, Subscription};
pub use ingest::Ingestor;
pub use memory::{MemoryLocationStore, MemoryTopology};
pub use simulator::{Simulator, SimulatorError, resolve_bus, spawn_simulator};
pub use snapshot::SnapshotQuery;
pub use store::{LocationStore, NewLocationReport, TopologyLookup, TopologyRegistry};
