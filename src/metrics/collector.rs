//! Lock-free per-worker stats counter

use super::StatsSnapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one worker
///
/// Cloning is cheap and every clone updates the same counters. Byte
/// counters only ever grow; `clients_connected` is bumped on join and
/// dropped on leave/error and never goes below zero.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    clients_connected: AtomicU64,
}

impl WorkerStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound payload
    #[inline]
    pub fn record_received(&self, bytes: u64) {
        self.inner.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record an outbound payload
    #[inline]
    pub fn record_sent(&self, bytes: u64) {
        self.inner.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    /// A session finished joining
    #[inline]
    pub fn client_joined(&self) {
        self.inner.clients_connected.fetch_add(1, Ordering::Relaxed);
    }

    /// A joined session left or errored
    ///
    /// Saturates at zero so a stray call can never wrap the counter.
    #[inline]
    pub fn client_departed(&self) {
        let _ = self.inner.clients_connected.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |current| current.checked_sub(1),
        );
    }

    /// Copy the current counter values
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_received: self.inner.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.inner.bytes_sent.load(Ordering::Relaxed),
            clients_connected: self.inner.clients_connected.load(Ordering::Relaxed),
        }
    }
}
