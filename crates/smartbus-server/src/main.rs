//! SmartBus backend binary.
//!
//! Wires the live-location core to a storage backend and the HTTP
//! surface, optionally starts the development simulator, and serves
//! until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `smartbus-config.yaml` and the environment
//! 3. Select stores: `PostgreSQL` when a database URL is set, else in-memory
//! 4. Build the broadcast hub and application state
//! 5. Start the simulator when enabled
//! 6. Serve HTTP + `WebSocket` until shutdown
//! 7. Stop the simulator and close the pool

mod error;

use std::path::Path;
use std::sync::Arc;

use smartbus_api::{AppState, ServerConfig};
use smartbus_core::{
    BroadcastHub, MemoryLocationStore, MemoryTopology, Simulator, SmartBusConfig, resolve_bus,
    spawn_simulator,
};
use smartbus_db::PostgresPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "smartbus-config.yaml";

/// Application entry point for the SmartBus backend.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), AppError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("smartbus-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        queue_capacity = config.hub.queue_capacity,
        send_timeout_ms = config.hub.send_timeout_ms,
        database = config.database.url.is_some(),
        simulator = config.simulator.enabled,
        "Configuration loaded"
    );

    // 3 + 4. Stores, hub and application state.
    let hub = BroadcastHub::new(config.hub.queue_capacity);
    let send_timeout = config.hub.send_timeout();
    let (state, pool) = match config.database.url.as_deref() {
        Some(url) => {
            let pool = PostgresPool::open(url, &config.database).await?;
            let state = AppState::new(
                Arc::new(pool.location_store()),
                Arc::new(pool.topology_store()),
                hub,
                send_timeout,
            );
            (state, Some(pool))
        }
        None => {
            info!("No database URL configured, using in-memory stores");
            let state = AppState::new(
                Arc::new(MemoryLocationStore::new()),
                Arc::new(MemoryTopology::new()),
                hub,
                send_timeout,
            );
            (state, None)
        }
    };
    let state = Arc::new(state);

    let shutdown = CancellationToken::new();

    // 5. Simulator.
    let simulator = if config.simulator.enabled {
        let bus_id = resolve_bus(state.registry.as_ref(), &config.simulator).await?;
        let sim = Simulator::new(
            bus_id,
            config.simulator.route.clone(),
            config.simulator.speed,
        )?;
        info!(
            %bus_id,
            interval_ms = config.simulator.interval_ms,
            "Simulator enabled"
        );
        Some(spawn_simulator(
            sim,
            Arc::clone(&state.ingestor),
            config.simulator.interval(),
            shutdown.child_token(),
        ))
    } else {
        None
    };

    // 6. Serve until Ctrl-C.
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
            }
            shutdown.cancel();
        }
    });

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = smartbus_api::start_server(&server_config, state, shutdown.clone()).await;

    // 7. Tear down.
    shutdown.cancel();
    if let Some(handle) = simulator {
        match handle.await {
            Ok(ticks) => info!(ticks, "Simulator stopped"),
            Err(e) => warn!("Simulator task failed: {e}"),
        }
    }
    if let Some(pool) = pool {
        pool.close().await;
    }

    served?;
    info!("smartbus-server stopped");
    Ok(())
}

/// Load configuration from `smartbus-config.yaml` if present, falling
/// back to defaults. Environment overrides apply either way.
fn load_config() -> Result<SmartBusConfig, AppError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok(SmartBusConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(SmartBusConfig::from_env()?)
    }
}
