//! Error types for the data layer.
//!
//! [`DbError`] wraps the underlying [`sqlx`] errors. At the store-trait
//! boundary it is folded into [`StoreError`], with constraint violations
//! mapped onto the core's domain variants by the caller that knows which
//! constraint was involved.

use smartbus_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The schema lacks an index the stores rely on.
    #[error("missing index {0} on bus_locations; apply migrations")]
    MissingIndex(&'static str),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::backend(err)
    }
}

/// Which integrity rule a failed statement broke, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation {
    ForeignKey,
    Unique,
    None,
}

/// Classify a statement failure by constraint kind.
pub(crate) fn violation(err: &sqlx::Error) -> Violation {
    match err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => Violation::ForeignKey,
        sqlx::Error::Database(db) if db.is_unique_violation() => Violation::Unique,
        _ => Violation::None,
    }
}
