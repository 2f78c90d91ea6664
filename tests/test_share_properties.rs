//! Property-based tests for load partitioning and counters
//!
//! - Every worker gets the same share and the realized total never falls
//!   short of the request, overshooting by less than one per worker
//! - `clients_connected` never goes below zero whatever the order of
//!   joins and departures
//! - The aggregate is the sum of the latest snapshot per live worker

use proptest::prelude::*;
use room_loadtest::plan::DEFAULT_REPORT_INTERVAL;
use room_loadtest::types::{ClientCount, Endpoint, TargetName, WorkerCount, WorkerId};
use room_loadtest::{LoadPlan, StatsSnapshot, StatsTable, TransportKind, WorkerStats, per_worker_share};
use std::collections::HashMap;
use std::time::Duration;

fn plan(total: usize, workers: usize) -> LoadPlan {
    LoadPlan {
        endpoint: Endpoint::new("ws://localhost:2567".to_string()).unwrap(),
        target: TargetName::new("battle".to_string()).unwrap(),
        total_clients: ClientCount::new(total).unwrap(),
        worker_count: WorkerCount::new(workers).unwrap(),
        open_delay: Duration::ZERO,
        report_interval: DEFAULT_REPORT_INTERVAL,
        script: "idle".to_string(),
        transport: TransportKind::Memory,
    }
}

#[derive(Debug, Clone)]
enum CounterOp {
    Join,
    Depart,
    Received(u64),
    Sent(u64),
}

fn counter_op() -> impl Strategy<Value = CounterOp> {
    prop_oneof![
        Just(CounterOp::Join),
        Just(CounterOp::Depart),
        (0u64..4096).prop_map(CounterOp::Received),
        (0u64..4096).prop_map(CounterOp::Sent),
    ]
}

proptest! {
    #[test]
    fn prop_share_covers_request(total in 1usize..10_000, workers in 1usize..256) {
        let share = per_worker_share(
            ClientCount::new(total).unwrap(),
            WorkerCount::new(workers).unwrap(),
        )
        .get();

        prop_assert!(share >= 1);
        prop_assert!(share * workers >= total);
        prop_assert!(share * workers < total + workers);
    }

    #[test]
    fn prop_assignments_are_uniform(total in 1usize..5_000, workers in 1usize..64) {
        let plan = plan(total, workers);
        let assignments: Vec<_> = plan.assignments().collect();

        prop_assert_eq!(assignments.len(), workers);
        prop_assert!(assignments.iter().all(|a| a.clients == plan.per_worker_share()));
        prop_assert_eq!(
            assignments.iter().map(|a| a.clients.get()).sum::<usize>(),
            plan.realized_total()
        );
    }

    #[test]
    fn prop_counters_never_negative(ops in prop::collection::vec(counter_op(), 0..200)) {
        let stats = WorkerStats::new();
        let mut connected: u64 = 0;
        let mut received: u64 = 0;
        let mut sent: u64 = 0;

        for op in ops {
            let before = stats.snapshot();
            match op {
                CounterOp::Join => {
                    stats.client_joined();
                    connected += 1;
                }
                CounterOp::Depart => {
                    stats.client_departed();
                    connected = connected.saturating_sub(1);
                }
                CounterOp::Received(n) => {
                    stats.record_received(n);
                    received += n;
                }
                CounterOp::Sent(n) => {
                    stats.record_sent(n);
                    sent += n;
                }
            }
            let after = stats.snapshot();
            prop_assert!(after.bytes_received >= before.bytes_received);
            prop_assert!(after.bytes_sent >= before.bytes_sent);
        }

        let snapshot = stats.snapshot();
        prop_assert_eq!(snapshot.clients_connected, connected);
        prop_assert_eq!(snapshot.bytes_received, received);
        prop_assert_eq!(snapshot.bytes_sent, sent);
    }

    #[test]
    fn prop_aggregate_sums_latest_rows(
        updates in prop::collection::vec((0usize..8, 0u64..1000, 0u64..1000, 0u64..50), 0..100),
        removed in prop::collection::vec(0usize..8, 0..4),
    ) {
        let table = StatsTable::new();
        let mut model: HashMap<usize, StatsSnapshot> = HashMap::new();

        for (worker, received, sent, connected) in updates {
            let snapshot = StatsSnapshot {
                bytes_received: received,
                bytes_sent: sent,
                clients_connected: connected,
            };
            table.apply(WorkerId::from_index(worker), snapshot);
            model.insert(worker, snapshot);
        }
        for worker in removed {
            table.remove(WorkerId::from_index(worker));
            model.remove(&worker);
        }

        let aggregate = table.aggregate();
        prop_assert_eq!(aggregate.reporting_workers, model.len());
        prop_assert_eq!(aggregate.bytes_received, model.values().map(|s| s.bytes_received).sum::<u64>());
        prop_assert_eq!(aggregate.bytes_sent, model.values().map(|s| s.bytes_sent).sum::<u64>());
        prop_assert_eq!(
            aggregate.clients_connected,
            model.values().map(|s| s.clients_connected).sum::<u64>()
        );
    }
}
