//! Type-safe identifier wrappers around database serial keys.
//!
//! Every persisted entity has a strongly-typed ID so a bus id can never be
//! passed where a route id is expected. Values are assigned by the store
//! (`BIGSERIAL` in `PostgreSQL`, a counter in the in-memory stores).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around `i64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw key value.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner key value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = core::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a registered bus.
    BusId
}

define_id! {
    /// Unique identifier for a route.
    RouteId
}

define_id! {
    /// Unique identifier for a stop on a route.
    StopId
}

define_id! {
    /// Unique identifier for a persisted location report.
    ReportId
}
