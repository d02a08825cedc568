//! Error taxonomy for the live-location core.
//!
//! - [`ValidationError`] -- malformed input, rejected before persistence
//! - [`StoreError`] -- a store could not accept a write or answer a read
//! - [`IngestError`] -- everything the ingestion path can report to a caller
//!
//! A missing record is not an error: queries return `Option`. Subscriber
//! faults never leave the broadcast hub, so they have no type here.

use smartbus_types::{BusId, RouteId};

/// A required field was missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The field was absent or `null`.
    #[error("missing required field: {field}")]
    Missing {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The field was present but not a number.
    #[error("field {field} must be numeric")]
    NotNumeric {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The field was numeric but outside its allowed domain.
    #[error("field {field} is out of range: {reason}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// A free-text field was empty.
    #[error("field {field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Failures reported by a [`LocationStore`](crate::store::LocationStore) or
/// [`TopologyRegistry`](crate::store::TopologyRegistry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend failed to accept a write or answer a read.
    #[error("storage backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// A write referenced a bus that does not exist.
    #[error("unknown bus {0}")]
    UnknownBus(BusId),

    /// A write referenced a route that does not exist.
    #[error("unknown route {0}")]
    UnknownRoute(RouteId),

    /// A stop with this `stop_order` already exists on the route.
    #[error("route {route_id} already has a stop with order {stop_order}")]
    DuplicateStopOrder {
        /// The route the stop was added to.
        route_id: RouteId,
        /// The clashing order value.
        stop_order: i32,
    },
}

impl StoreError {
    /// Build a [`StoreError::Backend`] from any displayable failure.
    pub fn backend(err: impl core::fmt::Display) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

/// Errors returned from the ingestion path.
///
/// None of these are ever broadcast: a report that fails here never
/// reaches a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// The inbound report was malformed.
    #[error("invalid location report: {0}")]
    Validation(#[from] ValidationError),

    /// The report referenced a bus that has not been registered.
    #[error("bus {0} is not registered")]
    UnknownBus(BusId),

    /// The store could not persist the report.
    #[error("failed to persist location report: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownBus(bus_id) => Self::UnknownBus(bus_id),
            other => Self::Persistence(other),
        }
    }
}
