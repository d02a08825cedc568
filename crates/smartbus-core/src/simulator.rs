//! Development simulator walking a synthetic bus along a fixed polyline.
//!
//! [`Simulator`] is a pure state machine: each [`Simulator::next_report`]
//! emits a report at the cursor and advances it, wrapping to the start
//! after the last vertex. [`spawn_simulator`] drives it from a single
//! timer and feeds every report through [`Ingestor::ingest_report`], the
//! same path real devices use, so persistence and broadcast rules apply
//! unchanged.

use std::sync::Arc;
use std::time::Duration;

use smartbus_types::{BusId, Coordinate, NewBus};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SimulatorSection;
use crate::error::StoreError;
use crate::ingest::Ingestor;
use crate::store::{NewLocationReport, TopologyRegistry};

/// Errors raised when building a simulator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulatorError {
    /// The polyline has no vertices.
    #[error("simulator route must contain at least one coordinate")]
    EmptyRoute,

    /// The configured speed is negative or not finite.
    #[error("simulator speed must be finite and non-negative")]
    InvalidSpeed,

    /// The synthetic bus could not be looked up or registered.
    #[error("failed to resolve simulator bus: {0}")]
    Store(#[from] StoreError),
}

/// Cyclic walk over a polyline for one synthetic bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulator {
    bus_id: BusId,
    route: Vec<Coordinate>,
    origin: Coordinate,
    cursor: usize,
    speed: f64,
}

impl Simulator {
    /// Create a simulator positioned at the first vertex.
    pub fn new(bus_id: BusId, route: Vec<Coordinate>, speed: f64) -> Result<Self, SimulatorError> {
        let origin = *route.first().ok_or(SimulatorError::EmptyRoute)?;
        if !speed.is_finite() || speed < 0.0 {
            return Err(SimulatorError::InvalidSpeed);
        }
        Ok(Self {
            bus_id,
            route,
            origin,
            cursor: 0,
            speed,
        })
    }

    /// The synthetic bus.
    pub const fn bus_id(&self) -> BusId {
        self.bus_id
    }

    /// Index of the vertex the next report will use.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor back to the first vertex.
    pub const fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Emit a report at the cursor, then advance (wrapping at the end).
    pub fn next_report(&mut self) -> NewLocationReport {
        let point = self.route.get(self.cursor).copied().unwrap_or(self.origin);
        self.cursor = self.cursor.saturating_add(1);
        if self.cursor >= self.route.len() {
            self.cursor = 0;
        }
        NewLocationReport {
            bus_id: self.bus_id,
            latitude: point.lat,
            longitude: point.lng,
            speed: self.speed,
        }
    }
}

/// Find the configured synthetic bus by fleet number, registering it on
/// first use.
pub async fn resolve_bus(
    registry: &dyn TopologyRegistry,
    section: &SimulatorSection,
) -> Result<BusId, SimulatorError> {
    let existing = registry
        .list_buses()
        .await?
        .into_iter()
        .find(|bus| bus.bus_number == section.bus_number);
    if let Some(bus) = existing {
        return Ok(bus.id);
    }

    let bus = registry
        .register_bus(NewBus {
            bus_number: section.bus_number.clone(),
            driver_name: section.driver_name.clone(),
        })
        .await?;
    info!(bus_id = %bus.id, bus_number = %bus.bus_number, "Registered simulator bus");
    Ok(bus.id)
}

/// Run `simulator` on a fixed interval until `cancel` fires.
///
/// The first tick is immediate. Cancellation stops future ticks; a tick
/// already being ingested finishes first. The task resolves to the number
/// of reports that were accepted.
pub fn spawn_simulator(
    mut simulator: Simulator,
    ingestor: Arc<Ingestor>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut accepted: u64 = 0;

        info!(
            bus_id = %simulator.bus_id(),
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "Simulator started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let cursor = simulator.cursor();
                    let report = simulator.next_report();
                    match ingestor.ingest_report(report).await {
                        Ok(stored) => {
                            accepted = accepted.saturating_add(1);
                            debug!(bus_id = %stored.bus_id, cursor, "Simulator tick");
                        }
                        Err(e) => warn!(error = %e, cursor, "Simulator tick rejected"),
                    }
                }
            }
        }

        info!(accepted, "Simulator stopped");
        accepted
    })
}
