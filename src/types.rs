//! Core types shared across the load-test engine
//!
//! Validated configuration values and identifiers for workers and connections.

pub mod config;
pub mod validated;

pub use config::{ClientCount, WorkerCount, duration_millis_serde};
pub use validated::{Endpoint, TargetName, ValidationError};

use serde::{Deserialize, Serialize};

/// Identifier for a worker slot
///
/// Slots are numbered `0..worker_count` by the coordinator and the id is
/// stable for the lifetime of the run, including after the worker exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(usize);

impl WorkerId {
    /// Create a worker ID from a slot index
    #[must_use]
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Get the underlying slot index
    #[must_use]
    #[inline]
    pub const fn as_index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

impl std::str::FromStr for WorkerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}
