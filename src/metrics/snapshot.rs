//! Point-in-time copy of a worker's counters

use serde::{Deserialize, Serialize};

/// Snapshot of one worker's [`WorkerStats`](super::WorkerStats)
///
/// Cumulative counters only. Rates are derived by the presentation layer
/// from deltas between snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub clients_connected: u64,
}

impl StatsSnapshot {
    /// Bytes moved in either direction
    #[must_use]
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.bytes_received.saturating_add(self.bytes_sent)
    }
}
