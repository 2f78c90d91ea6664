//! Coordinator-side merge of worker snapshots
//!
//! Live figures come from the workers still running. Byte counts of
//! workers that have exited are kept apart as retired totals, so the
//! run's traffic survives the workers that produced it.

use super::StatsSnapshot;
use crate::types::WorkerId;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sum of the last-known snapshot of every live worker
///
/// Pure projection of the [`StatsTable`]; never mutated directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub clients_connected: u64,
    /// Workers currently contributing a row
    pub reporting_workers: usize,
    /// Bytes received by workers that have exited
    pub retired_bytes_received: u64,
    /// Bytes sent by workers that have exited
    pub retired_bytes_sent: u64,
}

impl AggregateStats {
    /// Bytes received over the whole run, exited workers included
    #[must_use]
    #[inline]
    pub fn run_bytes_received(&self) -> u64 {
        self.bytes_received.saturating_add(self.retired_bytes_received)
    }

    /// Bytes sent over the whole run, exited workers included
    #[must_use]
    #[inline]
    pub fn run_bytes_sent(&self) -> u64 {
        self.bytes_sent.saturating_add(self.retired_bytes_sent)
    }

    /// Bytes moved in either direction over the whole run
    #[must_use]
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.run_bytes_received().saturating_add(self.run_bytes_sent())
    }
}

/// Last snapshot received from each live worker
///
/// Last write wins per worker. Snapshots from one worker arrive in the
/// order the worker emitted them, so applying them in arrival order keeps
/// the newest values. Cloning shares the same table.
#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    rows: Arc<DashMap<WorkerId, StatsSnapshot>>,
    retired_received: Arc<AtomicU64>,
    retired_sent: Arc<AtomicU64>,
}

impl StatsTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest snapshot for a worker
    pub fn apply(&self, worker: WorkerId, snapshot: StatsSnapshot) {
        self.rows.insert(worker, snapshot);
    }

    /// Drop a worker's row so it no longer contributes live figures
    ///
    /// Its byte counts move to the retired totals. Returns the row that
    /// was removed, if any.
    pub fn remove(&self, worker: WorkerId) -> Option<StatsSnapshot> {
        let (_, snapshot) = self.rows.remove(&worker)?;
        self.retired_received
            .fetch_add(snapshot.bytes_received, Ordering::Relaxed);
        self.retired_sent
            .fetch_add(snapshot.bytes_sent, Ordering::Relaxed);
        Some(snapshot)
    }

    /// Last snapshot stored for a worker
    #[must_use]
    pub fn get(&self, worker: WorkerId) -> Option<StatsSnapshot> {
        self.rows.get(&worker).map(|entry| *entry.value())
    }

    /// Recompute the sum across all rows
    #[must_use]
    pub fn aggregate(&self) -> AggregateStats {
        let retired = AggregateStats {
            retired_bytes_received: self.retired_received.load(Ordering::Relaxed),
            retired_bytes_sent: self.retired_sent.load(Ordering::Relaxed),
            ..AggregateStats::default()
        };
        self.rows.iter().fold(retired, |acc, entry| {
            let row = entry.value();
            AggregateStats {
                bytes_received: acc.bytes_received.saturating_add(row.bytes_received),
                bytes_sent: acc.bytes_sent.saturating_add(row.bytes_sent),
                clients_connected: acc.clients_connected.saturating_add(row.clients_connected),
                reporting_workers: acc.reporting_workers + 1,
                ..acc
            }
        })
    }
}
