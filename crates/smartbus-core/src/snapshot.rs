//! Snapshot query: the last known position of a bus.
//!
//! Reads straight through the [`LocationStore`], independent of the live
//! broadcast path. "No reports yet" is an ordinary `Ok(None)`, distinct
//! from a storage failure.

use std::sync::Arc;

use smartbus_types::{BusId, LocationReport};

use crate::error::StoreError;
use crate::store::LocationStore;

/// Answers "where is bus X right now".
#[derive(Clone)]
pub struct SnapshotQuery {
    locations: Arc<dyn LocationStore>,
}

impl core::fmt::Debug for SnapshotQuery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SnapshotQuery").finish_non_exhaustive()
    }
}

impl SnapshotQuery {
    /// Create a query over the given store.
    pub fn new(locations: Arc<dyn LocationStore>) -> Self {
        Self { locations }
    }

    /// The report with the greatest `recorded_at` for `bus_id`.
    ///
    /// Reflects every report whose persistence completed before the call.
    pub async fn latest(&self, bus_id: BusId) -> Result<Option<LocationReport>, StoreError> {
        self.locations.latest(bus_id).await
    }
}
