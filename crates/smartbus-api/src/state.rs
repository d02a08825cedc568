//! Shared application state for the SmartBus HTTP server.
//!
//! [`AppState`] bundles the core services the handlers call into: the
//! ingestor (which owns the broadcast hub), the snapshot query and the
//! topology registry. It is backend-agnostic; the binary decides whether
//! the stores behind it are in-memory or `PostgreSQL`.

use std::sync::Arc;
use std::time::Duration;

use smartbus_core::{
    BroadcastHub, Ingestor, LocationStore, MemoryLocationStore, MemoryTopology, SnapshotQuery,
    Subscription, TopologyLookup, TopologyRegistry,
};

/// Default bound on a single `WebSocket` push.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Validates, persists and publishes location reports.
    pub ingestor: Arc<Ingestor>,
    /// Latest-position reads.
    pub snapshot: SnapshotQuery,
    /// Bus, route and stop records.
    pub registry: Arc<dyn TopologyRegistry>,
    /// Longest a single push to a `WebSocket` client may take.
    pub send_timeout: Duration,
}

impl core::fmt::Debug for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState")
            .field("ingestor", &self.ingestor)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the handlers to a pair of stores and a hub.
    ///
    /// `registry` serves both the registration endpoints and the
    /// ingestor's registered-bus check.
    pub fn new<R>(
        locations: Arc<dyn LocationStore>,
        registry: Arc<R>,
        hub: BroadcastHub,
        send_timeout: Duration,
    ) -> Self
    where
        R: TopologyRegistry + 'static,
    {
        let topology: Arc<dyn TopologyLookup> = Arc::<R>::clone(&registry);
        let ingestor = Ingestor::new(Arc::clone(&locations), topology, hub);
        Self {
            ingestor: Arc::new(ingestor),
            snapshot: SnapshotQuery::new(locations),
            registry,
            send_timeout,
        }
    }

    /// State backed by fresh in-memory stores and a default hub.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryLocationStore::new()),
            Arc::new(MemoryTopology::new()),
            BroadcastHub::default(),
            DEFAULT_SEND_TIMEOUT,
        )
    }

    /// The hub accepted reports are published into.
    pub fn hub(&self) -> &BroadcastHub {
        self.ingestor.hub()
    }

    /// Attach a new live subscriber.
    pub fn subscribe(&self) -> Subscription {
        self.hub().subscribe()
    }
}
