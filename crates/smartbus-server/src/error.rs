//! Error types for the SmartBus server binary.
//!
//! [`AppError`] is the top-level error type that wraps every failure
//! mode during startup and while serving.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: smartbus_core::ConfigError,
    },

    /// Connecting to or migrating `PostgreSQL` failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: smartbus_db::DbError,
    },

    /// The simulator could not be started.
    #[error("simulator error: {source}")]
    Simulator {
        /// The underlying simulator error.
        #[from]
        source: smartbus_core::SimulatorError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: smartbus_api::ServerError,
    },
}
