//! Load plan: how the requested client count is split across workers
//!
//! The plan is resolved once at startup and never changes afterwards.
//! Every worker receives the same share, `ceil(total / workers)`, so the
//! realized number of attempted sessions is never below what was asked for.

use crate::transport::TransportKind;
use crate::types::{ClientCount, Endpoint, TargetName, WorkerCount, WorkerId, duration_millis_serde};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between worker stats snapshots
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(1000);

/// Number of clients each worker opens
///
/// `ceil(total_clients / worker_count)`. Pure and deterministic.
///
/// # Examples
/// ```
/// use room_loadtest::plan::per_worker_share;
/// use room_loadtest::types::{ClientCount, WorkerCount};
///
/// let share = per_worker_share(ClientCount::new(10).unwrap(), WorkerCount::new(3).unwrap());
/// assert_eq!(share.get(), 4);
/// ```
#[must_use]
pub fn per_worker_share(total_clients: ClientCount, worker_count: WorkerCount) -> ClientCount {
    let share = total_clients.get().div_ceil(worker_count.get());
    // total >= 1 and workers >= 1 so the share is at least 1
    ClientCount::new(share).unwrap_or(ClientCount::ONE)
}

/// Immutable description of a whole load test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPlan {
    pub endpoint: Endpoint,
    pub target: TargetName,
    pub total_clients: ClientCount,
    pub worker_count: WorkerCount,
    #[serde(with = "duration_millis_serde")]
    pub open_delay: Duration,
    #[serde(with = "duration_millis_serde")]
    pub report_interval: Duration,
    /// Built-in script every worker runs
    pub script: String,
    pub transport: TransportKind,
}

impl LoadPlan {
    /// Clients opened by each worker
    #[must_use]
    pub fn per_worker_share(&self) -> ClientCount {
        per_worker_share(self.total_clients, self.worker_count)
    }

    /// Total sessions that will be attempted across all workers
    ///
    /// Always `>= total_clients` and `== per_worker_share * worker_count`.
    #[must_use]
    pub fn realized_total(&self) -> usize {
        self.per_worker_share().get() * self.worker_count.get()
    }

    /// Sessions attempted beyond the requested total
    ///
    /// Every worker opens the same share, so rounding up can add a few.
    #[must_use]
    pub fn overshoot(&self) -> usize {
        self.realized_total() - self.total_clients.get()
    }

    /// Assignment for a single worker slot
    #[must_use]
    pub fn assignment(&self, worker_id: WorkerId) -> WorkerAssignment {
        WorkerAssignment {
            worker_id,
            endpoint: self.endpoint.clone(),
            target: self.target.clone(),
            clients: self.per_worker_share(),
            open_delay: self.open_delay,
            report_interval: self.report_interval,
            script: self.script.clone(),
            transport: self.transport,
        }
    }

    /// One assignment per worker slot, in slot order
    pub fn assignments(&self) -> impl Iterator<Item = WorkerAssignment> + '_ {
        (0..self.worker_count.get()).map(|index| self.assignment(WorkerId::from_index(index)))
    }
}

/// What a single worker is asked to do
///
/// A copy of the plan minus the worker count, with the local share of
/// clients in place of the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub worker_id: WorkerId,
    pub endpoint: Endpoint,
    pub target: TargetName,
    pub clients: ClientCount,
    #[serde(with = "duration_millis_serde")]
    pub open_delay: Duration,
    #[serde(with = "duration_millis_serde")]
    pub report_interval: Duration,
    pub script: String,
    pub transport: TransportKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(total: usize, workers: usize) -> LoadPlan {
        LoadPlan {
            endpoint: Endpoint::new("ws://localhost:2567".to_string()).unwrap(),
            target: TargetName::new("battle".to_string()).unwrap(),
            total_clients: ClientCount::new(total).unwrap(),
            worker_count: WorkerCount::new(workers).unwrap(),
            open_delay: Duration::from_millis(100),
            report_interval: DEFAULT_REPORT_INTERVAL,
            script: "idle".to_string(),
            transport: TransportKind::Memory,
        }
    }

    #[test]
    fn test_ten_clients_three_workers() {
        let plan = plan(10, 3);
        let shares: Vec<usize> = plan.assignments().map(|a| a.clients.get()).collect();
        assert_eq!(shares, vec![4, 4, 4]);
        assert_eq!(plan.realized_total(), 12);
        assert_eq!(plan.overshoot(), 2);
    }

    #[test]
    fn test_even_split() {
        let plan = plan(12, 4);
        assert_eq!(plan.per_worker_share().get(), 3);
        assert_eq!(plan.realized_total(), 12);
        assert_eq!(plan.overshoot(), 0);
    }

    #[test]
    fn test_more_workers_than_clients() {
        let plan = plan(2, 5);
        assert_eq!(plan.per_worker_share().get(), 1);
        assert_eq!(plan.realized_total(), 5);
    }

    #[test]
    fn test_assignment_copies_plan() {
        let plan = plan(10, 3);
        let assignment = plan.assignment(WorkerId::from_index(2));
        assert_eq!(assignment.worker_id, WorkerId::from_index(2));
        assert_eq!(assignment.endpoint, plan.endpoint);
        assert_eq!(assignment.target, plan.target);
        assert_eq!(assignment.open_delay, Duration::from_millis(100));
        assert_eq!(assignment.script, "idle");
    }

    #[test]
    fn test_assignment_ids_in_slot_order() {
        let plan = plan(6, 3);
        let ids: Vec<usize> = plan.assignments().map(|a| a.worker_id.as_index()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
