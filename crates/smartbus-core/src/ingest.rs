//! Ingestion endpoint: validate, persist, then broadcast.
//!
//! Every accepted call produces exactly one durable record and at most one
//! broadcast. The broadcast happens only after the store has confirmed the
//! write, so a report that fails to persist never reaches a subscriber.
//!
//! Persist-then-publish for one bus runs under that bus's lock, which
//! keeps the published stream for a bus in `recorded_at` order even when
//! several calls for the same bus overlap. Calls for different buses never
//! wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use smartbus_types::{BusId, LocationReport, RawLocationReport};
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::hub::BroadcastHub;
use crate::store::{LocationStore, NewLocationReport, TopologyLookup};
use crate::validate;

/// Accepts GPS reports from devices and the simulator.
pub struct Ingestor {
    locations: Arc<dyn LocationStore>,
    topology: Arc<dyn TopologyLookup>,
    hub: BroadcastHub,
    /// One lock per registered bus. Entries are never removed; they are
    /// only created after the registered-bus check, so the map is bounded
    /// by fleet size.
    bus_locks: Mutex<HashMap<BusId, Arc<tokio::sync::Mutex<()>>>>,
}

impl core::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ingestor")
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

impl Ingestor {
    /// Wire an ingestor to its stores and the hub it publishes into.
    pub fn new(
        locations: Arc<dyn LocationStore>,
        topology: Arc<dyn TopologyLookup>,
        hub: BroadcastHub,
    ) -> Self {
        Self {
            locations,
            topology,
            hub,
            bus_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The hub accepted reports are published into.
    pub const fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Validate and ingest a raw inbound report.
    ///
    /// Returns the persisted report. The broadcast has been queued but not
    /// necessarily delivered when this returns.
    pub async fn ingest(&self, raw: &RawLocationReport) -> Result<LocationReport, IngestError> {
        let report = validate::location_report(raw)?;
        self.ingest_report(report).await
    }

    /// Ingest an already well-formed report.
    ///
    /// Rejects reports for buses the topology does not know.
    pub async fn ingest_report(
        &self,
        report: NewLocationReport,
    ) -> Result<LocationReport, IngestError> {
        let bus_id = report.bus_id;
        if self
            .topology
            .bus(bus_id)
            .await
            .map_err(IngestError::Persistence)?
            .is_none()
        {
            debug!(%bus_id, "Rejected report for unregistered bus");
            return Err(IngestError::UnknownBus(bus_id));
        }

        let lock = self.bus_lock(bus_id);
        let _guard = lock.lock().await;

        let stored = match self.locations.append(report).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(%bus_id, error = %e, "Failed to persist location report");
                return Err(e.into());
            }
        };

        let outcome = self.hub.publish(stored.to_update());
        debug!(
            %bus_id,
            report_id = %stored.id,
            delivered = outcome.delivered,
            detached = outcome.detached,
            "Location report accepted"
        );

        Ok(stored)
    }

    fn bus_lock(&self, bus_id: BusId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .bus_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(bus_id).or_default())
    }
}
