//! Throughput and connection telemetry
//!
//! Three layers, from the hot path outwards:
//! - [`WorkerStats`]: lock-free counters owned by one worker, bumped from
//!   transport event handlers
//! - [`StatsSnapshot`]: a by-value copy of those counters, shipped to the
//!   coordinator on every report tick
//! - [`StatsTable`] / [`AggregateStats`]: the coordinator's last-known
//!   snapshot per worker and the sum across them

mod aggregate;
mod collector;
mod snapshot;

pub use aggregate::{AggregateStats, StatsTable};
pub use collector::WorkerStats;
pub use snapshot::StatsSnapshot;
