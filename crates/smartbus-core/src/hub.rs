//! Broadcast hub fanning accepted location updates out to live subscribers.
//!
//! The hub owns the subscriber set. Each subscriber gets its own bounded
//! queue; [`BroadcastHub::publish`] pushes into every queue with
//! `try_send` while holding the set's lock, so it never waits on a
//! subscriber. A subscriber whose queue is full (it is not keeping pace)
//! or closed (its connection went away) is detached on the spot and simply
//! misses everything published afterwards.
//!
//! # Ordering
//!
//! The whole fan-out of one publish happens under a single lock, so all
//! subscribers observe publishes in one common order. Per-bus order
//! follows from that as long as callers publish a bus's updates in order,
//! which the ingestion path guarantees.
//!
//! # Lifecycle
//!
//! ```text
//! subscribe() -> Subscription ──recv()──> Some(update) ... None (detached)
//!                     │
//!                     └── drop / unsubscribe(id) -> removed from the set
//! ```
//!
//! New subscribers only see updates published after they subscribed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use smartbus_types::LocationUpdate;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

/// Default number of updates a subscriber may have queued before it is
/// considered too slow and detached.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Identifier of one live subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of one publish, used for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the update was queued for.
    pub delivered: usize,
    /// Subscribers detached during this publish.
    pub detached: usize,
}

type Outbox = mpsc::Sender<Arc<LocationUpdate>>;

#[derive(Debug)]
struct Shared {
    subscribers: Mutex<HashMap<SubscriberId, Outbox>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Shared {
    fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }
}

/// Fan-out point between ingestion and live subscribers.
///
/// Cheap to clone; all clones share one subscriber set.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    shared: Arc<Shared>,
}

impl BroadcastHub {
    /// Create a hub whose subscribers each buffer up to `capacity` updates.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Per-subscriber queue capacity.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Register a new subscriber.
    ///
    /// The returned [`Subscription`] receives every update published from
    /// now on until it is dropped, unsubscribed or detached.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.shared.capacity);
        let active = {
            let mut subscribers = self
                .shared
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.insert(id, tx);
            subscribers.len()
        };
        info!(subscriber = %id, active, "Subscriber attached");
        Subscription {
            id,
            rx,
            hub: Arc::downgrade(&self.shared),
        }
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    ///
    /// No delivery is attempted to it after this returns. Updates already
    /// sitting in its queue can still be drained by the holder.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.shared.remove(id);
        if removed {
            info!(subscriber = %id, "Subscriber detached");
        }
        removed
    }

    /// Queue `update` for every active subscriber.
    ///
    /// Never blocks and never fails. Subscribers that cannot accept the
    /// update are detached.
    pub fn publish(&self, update: LocationUpdate) -> PublishReport {
        let update = Arc::new(update);
        let mut report = PublishReport::default();
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        subscribers.retain(|id, outbox| match outbox.try_send(Arc::clone(&update)) {
            Ok(()) => {
                report.delivered = report.delivered.saturating_add(1);
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(subscriber = %id, bus_id = %update.bus_id, "Subscriber queue full, detaching");
                report.detached = report.detached.saturating_add(1);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %id, "Subscriber connection gone, detaching");
                report.detached = report.detached.saturating_add(1);
                false
            }
        });

        report
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// A live subscriber's end of the hub.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<LocationUpdate>>,
    hub: Weak<Shared>,
}

impl Subscription {
    /// This subscriber's identifier.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next update.
    ///
    /// Returns `None` once the subscriber has been detached and its queue
    /// drained, or when the hub itself is gone.
    pub async fn recv(&mut self) -> Option<Arc<LocationUpdate>> {
        self.rx.recv().await
    }

    /// Take the next update if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<LocationUpdate>> {
        self.rx.try_recv().ok()
    }

    /// Whether the hub still delivers to this subscriber.
    pub fn is_attached(&self) -> bool {
        self.hub.upgrade().is_some_and(|shared| {
            shared
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&self.id)
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.hub.upgrade()
            && shared.remove(self.id)
        {
            debug!(subscriber = %self.id, "Subscription dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use std::time::Duration;

    use smartbus_types::BusId;

    use super::*;

    fn update(bus: i64, speed: f64) -> LocationUpdate {
        LocationUpdate {
            bus_id: BusId::new(bus),
            latitude: 13.08,
            longitude: 80.27,
            speed,
        }
    }

    fn drain(sub: &mut Subscription) -> Vec<f64> {
        let mut speeds = Vec::new();
        while let Some(u) = sub.try_recv() {
            speeds.push(u.speed);
        }
        speeds
    }

    #[test]
    fn late_subscriber_sees_only_later_updates() {
        let hub = BroadcastHub::default();
        let mut s1 = hub.subscribe();
        hub.publish(update(2, 1.0));
        let mut s2 = hub.subscribe();
        hub.publish(update(2, 2.0));

        assert_eq!(drain(&mut s1), vec![1.0, 2.0]);
        assert_eq!(drain(&mut s2), vec![2.0]);
    }

    #[test]
    fn per_bus_order_is_preserved() {
        let hub = BroadcastHub::default();
        let mut sub = hub.subscribe();
        for i in 0..20_u8 {
            hub.publish(update(1, f64::from(i)));
            hub.publish(update(2, f64::from(i)));
        }
        let mut bus1 = Vec::new();
        while let Some(u) = sub.try_recv() {
            if u.bus_id == BusId::new(1) {
                bus1.push(u.speed);
            }
        }
        let expected: Vec<f64> = (0..20_u8).map(f64::from).collect();
        assert_eq!(bus1, expected);
    }

    #[test]
    fn full_queue_detaches_only_the_slow_subscriber() {
        let hub = BroadcastHub::new(2);
        let mut slow = hub.subscribe();
        let mut healthy = hub.subscribe();

        let first = hub.publish(update(1, 1.0));
        assert_eq!(first.delivered, 2);
        assert_eq!(drain(&mut healthy), vec![1.0]);

        hub.publish(update(1, 2.0));
        assert_eq!(drain(&mut healthy), vec![2.0]);

        // slow now holds two queued updates; the third overflows it.
        let third = hub.publish(update(1, 3.0));
        assert_eq!(third, PublishReport { delivered: 1, detached: 1 });
        assert!(!slow.is_attached());
        assert!(healthy.is_attached());
        assert_eq!(drain(&mut healthy), vec![3.0]);

        hub.publish(update(1, 4.0));
        assert_eq!(drain(&mut healthy), vec![4.0]);
        // The slow subscriber keeps what it had buffered, then ends.
        assert_eq!(drain(&mut slow), vec![1.0, 2.0]);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn detached_subscriber_stream_ends() {
        let hub = BroadcastHub::new(1);
        let mut sub = hub.subscribe();
        assert!(hub.unsubscribe(sub.id()));
        assert!(!hub.unsubscribe(sub.id()));
        let next = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await;
        assert!(matches!(next, Ok(None)));
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let hub = BroadcastHub::default();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(update(1, 1.0)), PublishReport::default());
    }

    #[test]
    fn publish_with_no_subscribers_is_not_an_error() {
        let hub = BroadcastHub::default();
        assert_eq!(hub.publish(update(1, 1.0)).delivered, 0);
    }

    #[tokio::test]
    async fn concurrent_publishers_reach_every_subscriber() {
        let hub = BroadcastHub::new(1024);
        let mut subs: Vec<Subscription> = (0..4).map(|_| hub.subscribe()).collect();

        let mut tasks = Vec::new();
        for bus in 0..8_i64 {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50_u8 {
                    hub.publish(update(bus, f64::from(i)));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        for sub in &mut subs {
            let mut per_bus: HashMap<BusId, Vec<f64>> = HashMap::new();
            while let Some(u) = sub.try_recv() {
                per_bus.entry(u.bus_id).or_default().push(u.speed);
            }
            assert_eq!(per_bus.len(), 8);
            let expected: Vec<f64> = (0..50_u8).map(f64::from).collect();
            assert!(per_bus.values().all(|speeds| *speeds == expected));
        }
    }
}
