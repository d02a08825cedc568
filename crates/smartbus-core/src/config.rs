//! Configuration loading and typed config structures for SmartBus.
//!
//! Configuration lives in an optional `smartbus-config.yaml`. Every field
//! has a default, so an empty or missing file yields a working development
//! setup (in-memory stores, simulator off, port 5000).
//!
//! Environment variables override the file:
//! - `PORT` overrides `server.port`
//! - `DATABASE_URL` overrides `database.url`
//! - `SIMULATOR_ENABLED` overrides `simulator.enabled`

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use smartbus_types::Coordinate;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {message}")]
    InvalidOverride {
        /// The environment variable name.
        name: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SmartBusConfig {
    /// Network listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Broadcast hub backpressure settings.
    #[serde(default)]
    pub hub: HubSection,

    /// Optional `PostgreSQL` store.
    #[serde(default)]
    pub database: DatabaseSection,

    /// Development simulator.
    #[serde(default)]
    pub simulator: SimulatorSection,
}

impl SmartBusConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for a malformed environment value.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for when no file exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides looked up through `lookup` (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidOverride {
                    name: "PORT",
                    message: e.to_string(),
                }
            })?;
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(enabled) = lookup("SIMULATOR_ENABLED") {
            self.simulator.enabled = parse_flag(&enabled).ok_or_else(|| {
                ConfigError::InvalidOverride {
                    name: "SIMULATOR_ENABLED",
                    message: format!("expected true/false, got {enabled:?}"),
                }
            })?;
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Network listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Broadcast hub backpressure settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubSection {
    /// Updates a subscriber may have queued before it is detached.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Longest a single push to a subscriber connection may take before
    /// the subscriber is detached.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl HubSection {
    /// [`send_timeout_ms`](Self::send_timeout_ms) as a [`Duration`].
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

/// `PostgreSQL` settings. Without a URL the in-memory stores are used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSection {
    /// Connection URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Acquire timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Run migrations on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            run_migrations: true,
        }
    }
}

/// Development simulator settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulatorSection {
    /// Whether the simulator runs at all.
    #[serde(default)]
    pub enabled: bool,

    /// Milliseconds between ticks.
    #[serde(default = "default_sim_interval_ms")]
    pub interval_ms: u64,

    /// Fleet number of the synthetic bus (registered if missing).
    #[serde(default = "default_sim_bus_number")]
    pub bus_number: String,

    /// Driver name of the synthetic bus.
    #[serde(default = "default_sim_driver")]
    pub driver_name: String,

    /// Speed reported on every tick.
    #[serde(default = "default_sim_speed")]
    pub speed: f64,

    /// Polyline walked cyclically.
    #[serde(default = "default_sim_route")]
    pub route: Vec<Coordinate>,
}

impl SimulatorSection {
    /// [`interval_ms`](Self::interval_ms) as a [`Duration`], never zero.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_sim_interval_ms(),
            bus_number: default_sim_bus_number(),
            driver_name: default_sim_driver(),
            speed: default_sim_speed(),
            route: default_sim_route(),
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    5000
}

const fn default_queue_capacity() -> usize {
    crate::hub::DEFAULT_QUEUE_CAPACITY
}

const fn default_send_timeout_ms() -> u64 {
    5_000
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

const fn default_true() -> bool {
    true
}

const fn default_sim_interval_ms() -> u64 {
    3_000
}

fn default_sim_bus_number() -> String {
    String::from("SIM-1")
}

fn default_sim_driver() -> String {
    String::from("Simulator")
}

const fn default_sim_speed() -> f64 {
    35.0
}

/// Marina-bound run through central Chennai.
fn default_sim_route() -> Vec<Coordinate> {
    vec![
        Coordinate::new(13.0827, 80.2707),
        Coordinate::new(13.0805, 80.2690),
        Coordinate::new(13.0780, 80.2680),
        Coordinate::new(13.0755, 80.2675),
        Coordinate::new(13.0720, 80.2685),
        Coordinate::new(13.0690, 80.2700),
        Coordinate::new(13.0655, 80.2720),
        Coordinate::new(13.0620, 80.2740),
        Coordinate::new(13.0585, 80.2760),
    ]
}
