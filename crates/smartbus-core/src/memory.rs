//! In-process implementations of the storage seams.
//!
//! Used when no database is configured and throughout the test suites.
//! State lives behind a [`RwLock`] so reads never contend with each other.
//! [`MemoryLocationStore`] can be told to fail reads or writes, which is how
//! the persistence-failure paths are exercised.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use smartbus_types::{
    Bus, BusId, LocationReport, NewBus, NewRoute, NewStop, ReportId, Route, RouteDetail, RouteId,
    Stop, StopId,
};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{LocationStore, NewLocationReport, TopologyLookup, TopologyRegistry};

/// Advance a serial counter and return the new value.
fn next_serial(counter: &mut i64) -> Result<i64, StoreError> {
    let next = counter
        .checked_add(1)
        .ok_or_else(|| StoreError::backend("serial key space exhausted"))?;
    *counter = next;
    Ok(next)
}

/// Pick a timestamp strictly after `previous`, preferring the wall clock.
fn monotonic_after(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev
            .checked_add_signed(TimeDelta::microseconds(1))
            .unwrap_or(prev),
        _ => now,
    }
}

// ---------------------------------------------------------------------------
// Location store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LocationLog {
    last_id: i64,
    by_bus: HashMap<BusId, Vec<LocationReport>>,
}

/// Append-only in-memory location history.
#[derive(Debug, Default)]
pub struct MemoryLocationStore {
    log: RwLock<LocationLog>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryLocationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Make every subsequent `latest` fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    /// Every report stored for `bus_id`, oldest first.
    pub async fn history(&self, bus_id: BusId) -> Vec<LocationReport> {
        self.log
            .read()
            .await
            .by_bus
            .get(&bus_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    async fn append(&self, report: NewLocationReport) -> Result<LocationReport, StoreError> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(StoreError::backend("location store rejected write"));
        }

        let mut log = self.log.write().await;
        let id = next_serial(&mut log.last_id)?;
        let history = log.by_bus.entry(report.bus_id).or_default();
        let recorded_at = monotonic_after(history.last().map(|r| r.recorded_at));

        let stored = LocationReport {
            id: ReportId::new(id),
            bus_id: report.bus_id,
            latitude: report.latitude,
            longitude: report.longitude,
            speed: report.speed,
            recorded_at,
        };
        history.push(stored.clone());
        Ok(stored)
    }

    async fn latest(&self, bus_id: BusId) -> Result<Option<LocationReport>, StoreError> {
        if self.fail_reads.load(Ordering::Acquire) {
            return Err(StoreError::backend("location store unavailable"));
        }

        // History is appended in recorded_at order, so the tail is the max.
        Ok(self
            .log
            .read()
            .await
            .by_bus
            .get(&bus_id)
            .and_then(|history| history.last().cloned()))
    }
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TopologyState {
    last_bus: i64,
    last_route: i64,
    last_stop: i64,
    buses: BTreeMap<BusId, Bus>,
    routes: BTreeMap<RouteId, Route>,
    stops: BTreeMap<RouteId, Vec<Stop>>,
}

/// In-memory bus/route/stop registry.
#[derive(Debug, Default)]
pub struct MemoryTopology {
    state: RwLock<TopologyState>,
}

impl MemoryTopology {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopologyLookup for MemoryTopology {
    async fn bus(&self, bus_id: BusId) -> Result<Option<Bus>, StoreError> {
        Ok(self.state.read().await.buses.get(&bus_id).cloned())
    }

    async fn route_detail(&self, route_id: RouteId) -> Result<Option<RouteDetail>, StoreError> {
        let state = self.state.read().await;
        let Some(route) = state.routes.get(&route_id).cloned() else {
            return Ok(None);
        };
        let mut stops = state.stops.get(&route_id).cloned().unwrap_or_default();
        stops.sort_by_key(|stop| stop.stop_order);
        Ok(Some(RouteDetail { route, stops }))
    }
}

#[async_trait]
impl TopologyRegistry for MemoryTopology {
    async fn register_bus(&self, bus: NewBus) -> Result<Bus, StoreError> {
        let mut state = self.state.write().await;
        let id = BusId::new(next_serial(&mut state.last_bus)?);
        let record = Bus {
            id,
            bus_number: bus.bus_number,
            driver_name: bus.driver_name,
            route_id: None,
            created_at: Utc::now(),
        };
        state.buses.insert(id, record.clone());
        Ok(record)
    }

    async fn list_buses(&self) -> Result<Vec<Bus>, StoreError> {
        Ok(self.state.read().await.buses.values().cloned().collect())
    }

    async fn create_route(&self, route: NewRoute) -> Result<Route, StoreError> {
        let mut state = self.state.write().await;
        let id = RouteId::new(next_serial(&mut state.last_route)?);
        let record = Route {
            id,
            route_name: route.route_name,
            start_location: route.start_location,
            end_location: route.end_location,
            created_at: Utc::now(),
        };
        state.routes.insert(id, record.clone());
        Ok(record)
    }

    async fn list_routes(&self) -> Result<Vec<Route>, StoreError> {
        Ok(self.state.read().await.routes.values().cloned().collect())
    }

    async fn add_stop(&self, route_id: RouteId, stop: NewStop) -> Result<Stop, StoreError> {
        let mut state = self.state.write().await;
        if !state.routes.contains_key(&route_id) {
            return Err(StoreError::UnknownRoute(route_id));
        }
        let clash = state
            .stops
            .get(&route_id)
            .is_some_and(|stops| stops.iter().any(|s| s.stop_order == stop.stop_order));
        if clash {
            return Err(StoreError::DuplicateStopOrder {
                route_id,
                stop_order: stop.stop_order,
            });
        }

        let id = StopId::new(next_serial(&mut state.last_stop)?);
        let record = Stop {
            id,
            route_id,
            stop_name: stop.stop_name,
            latitude: stop.latitude,
            longitude: stop.longitude,
            stop_order: stop.stop_order,
            created_at: Utc::now(),
        };
        state.stops.entry(route_id).or_default().push(record.clone());
        Ok(record)
    }

    async fn assign_route(&self, bus_id: BusId, route_id: RouteId) -> Result<Bus, StoreError> {
        let mut state = self.state.write().await;
        if !state.routes.contains_key(&route_id) {
            return Err(StoreError::UnknownRoute(route_id));
        }
        let bus = state
            .buses
            .get_mut(&bus_id)
            .ok_or(StoreError::UnknownBus(bus_id))?;
        bus.route_id = Some(route_id);
        Ok(bus.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;

    fn report(bus: i64, speed: f64) -> NewLocationReport {
        NewLocationReport {
            bus_id: BusId::new(bus),
            latitude: 13.08,
            longitude: 80.27,
            speed,
        }
    }

    fn stop(name: &str, order: i32) -> NewStop {
        NewStop {
            stop_name: name.to_owned(),
            latitude: 13.0,
            longitude: 80.0,
            stop_order: order,
        }
    }

    async fn route(topology: &MemoryTopology, name: &str) -> Route {
        topology
            .create_route(NewRoute {
                route_name: name.to_owned(),
                start_location: "Central".to_owned(),
                end_location: "Beach".to_owned(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn latest_tracks_most_recent_append() {
        let store = MemoryLocationStore::new();
        for speed in [10.0, 20.0, 30.0] {
            store.append(report(1, speed)).await.unwrap();
        }
        let latest = store.latest(BusId::new(1)).await.unwrap().unwrap();
        assert_eq!(latest.speed, 30.0);

        let history = store.history(BusId::new(1)).await;
        assert_eq!(history.len(), 3);
        assert!(
            history
                .windows(2)
                .all(|w| w.first().map(|a| a.recorded_at) < w.get(1).map(|b| b.recorded_at))
        );
    }

    #[tokio::test]
    async fn latest_is_none_without_reports() {
        let store = MemoryLocationStore::new();
        store.append(report(1, 5.0)).await.unwrap();
        assert!(store.latest(BusId::new(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_backend_errors() {
        let store = MemoryLocationStore::new();
        store.set_fail_writes(true);
        assert!(matches!(
            store.append(report(1, 5.0)).await,
            Err(StoreError::Backend { .. })
        ));
        store.set_fail_writes(false);
        store.set_fail_reads(true);
        assert!(store.latest(BusId::new(1)).await.is_err());
        store.set_fail_reads(false);
        assert!(store.latest(BusId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn route_detail_orders_stops_regardless_of_insertion() {
        let topology = MemoryTopology::new();
        let r = route(&topology, "R").await;
        topology.add_stop(r.id, stop("third", 3)).await.unwrap();
        topology.add_stop(r.id, stop("first", 1)).await.unwrap();
        topology.add_stop(r.id, stop("second", 2)).await.unwrap();

        let detail = topology.route_detail(r.id).await.unwrap().unwrap();
        let orders: Vec<i32> = detail.stops.iter().map(|s| s.stop_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn duplicate_stop_order_is_rejected() {
        let topology = MemoryTopology::new();
        let r = route(&topology, "R").await;
        topology.add_stop(r.id, stop("a", 1)).await.unwrap();
        let err = topology.add_stop(r.id, stop("b", 1)).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateStopOrder {
                route_id: r.id,
                stop_order: 1
            }
        );
    }

    #[tokio::test]
    async fn reassignment_overwrites_previous_route() {
        let topology = MemoryTopology::new();
        let bus = topology
            .register_bus(NewBus {
                bus_number: "B1".to_owned(),
                driver_name: "Ravi".to_owned(),
            })
            .await
            .unwrap();
        let r1 = route(&topology, "R").await;
        let r2 = route(&topology, "R2").await;

        topology.assign_route(bus.id, r1.id).await.unwrap();
        topology.assign_route(bus.id, r2.id).await.unwrap();

        assert_eq!(topology.route_for_bus(bus.id).await.unwrap(), Some(r2.id));
    }

    #[tokio::test]
    async fn assignment_requires_known_bus_and_route() {
        let topology = MemoryTopology::new();
        let r = route(&topology, "R").await;
        assert_eq!(
            topology.assign_route(BusId::new(99), r.id).await.unwrap_err(),
            StoreError::UnknownBus(BusId::new(99))
        );
        assert!(topology.add_stop(RouteId::new(99), stop("x", 1)).await.is_err());
    }
}
