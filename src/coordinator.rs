//! Coordinator: spawns workers, merges their stats, relays their events
//!
//! Snapshots land in a [`StatsTable`] keyed by worker; the aggregate is
//! republished through a [`Debounce`] so a burst of snapshots costs one
//! recompute. A worker exit (clean or crashed) removes its row at once
//! and republishes without waiting, so a crashed worker's connections
//! drop out of the totals immediately. Its traffic stays in the run
//! totals as retired bytes.
//!
//! Presentation reads the results from a [`Telemetry`] handle.

use crate::events::{TelemetryEvent, WorkerEvent};
use crate::metrics::{AggregateStats, StatsTable};
use crate::plan::LoadPlan;
use crate::rate_limit::{DEFAULT_WAIT, Debounce};
use crate::types::WorkerId;
use crate::worker::{WorkerExit, WorkerLauncher, WorkerMessage, WorkerMessageKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Presentation side of a run
#[derive(Debug)]
pub struct Telemetry {
    /// Latest published aggregate
    pub aggregate: watch::Receiver<AggregateStats>,
    /// Diagnostic and serializer events from every worker
    pub events: mpsc::UnboundedReceiver<TelemetryEvent>,
}

/// Outcome of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub started: usize,
    pub failed_to_start: usize,
    pub crashed: usize,
    /// Aggregate once the last worker exited
    ///
    /// No live rows remain, so the traffic of the run is in the retired
    /// byte totals.
    pub last_aggregate: AggregateStats,
}

/// Aggregate publication, shared with the debounced callback
#[derive(Debug, Clone)]
struct Publisher {
    table: StatsTable,
    aggregate: Arc<watch::Sender<AggregateStats>>,
}

impl Publisher {
    fn publish(&self) -> AggregateStats {
        let aggregate = self.table.aggregate();
        self.aggregate.send_replace(aggregate);
        aggregate
    }
}

pub struct Coordinator {
    plan: LoadPlan,
    launcher: Arc<dyn WorkerLauncher>,
    publisher: Publisher,
    debounced: Debounce<(), AggregateStats>,
    events: mpsc::UnboundedSender<TelemetryEvent>,
}

impl Coordinator {
    /// Coordinator for `plan` plus the handle presentation reads from
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(plan: LoadPlan, launcher: Arc<dyn WorkerLauncher>) -> (Self, Telemetry) {
        Self::with_publish_wait(plan, launcher, DEFAULT_WAIT)
    }

    /// Same as [`Coordinator::new`] with a custom debounce window
    #[must_use]
    pub fn with_publish_wait(
        plan: LoadPlan,
        launcher: Arc<dyn WorkerLauncher>,
        wait: Duration,
    ) -> (Self, Telemetry) {
        let (aggregate_tx, aggregate_rx) = watch::channel(AggregateStats::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let publisher = Publisher {
            table: StatsTable::new(),
            aggregate: Arc::new(aggregate_tx),
        };
        let debounced = {
            let publisher = publisher.clone();
            Debounce::new(wait, move |()| publisher.publish())
        };

        let coordinator = Self {
            plan,
            launcher,
            publisher,
            debounced,
            events: events_tx,
        };
        let telemetry = Telemetry {
            aggregate: aggregate_rx,
            events: events_rx,
        };
        (coordinator, telemetry)
    }

    #[must_use]
    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    /// Start every worker and relay their output until all have exited
    ///
    /// A worker that fails to start is reported as an error event for its
    /// slot; the others keep running. Shutdown reaches workers through
    /// `shutdown`; this returns once the last one is gone.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> RunSummary {
        let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMessage>();
        let mut summary = RunSummary::default();

        info!(
            workers = self.plan.worker_count.get(),
            per_worker = self.plan.per_worker_share().get(),
            total = self.plan.realized_total(),
            "Starting workers"
        );

        for assignment in self.plan.assignments() {
            let worker = assignment.worker_id;
            match self
                .launcher
                .launch(assignment, shutdown.clone(), tx.clone())
                .await
            {
                Ok(()) => {
                    debug!(%worker, "Worker launched");
                    summary.started += 1;
                }
                Err(e) => {
                    error!(%worker, "Failed to start worker: {}", e);
                    summary.failed_to_start += 1;
                    self.forward(worker, WorkerEvent::error(format!("failed to start: {}", e)));
                }
            }
        }
        drop(tx);

        let mut live = summary.started;
        while live > 0 {
            let Some(message) = rx.recv().await else {
                warn!("Lost contact with {} worker(s)", live);
                break;
            };
            match message.kind {
                WorkerMessageKind::Event(event) => self.on_worker_event(message.worker, event),
                WorkerMessageKind::Exited(exit) => {
                    live -= 1;
                    if exit.is_crash() {
                        summary.crashed += 1;
                    }
                    self.on_worker_exit(message.worker, exit);
                }
            }
        }

        summary.last_aggregate = self.publisher.publish();
        info!(
            started = summary.started,
            crashed = summary.crashed,
            failed_to_start = summary.failed_to_start,
            "All workers stopped"
        );
        summary
    }

    /// Route one event from a worker
    ///
    /// Snapshots replace the worker's row and schedule a publish;
    /// everything else goes to presentation unchanged.
    pub fn on_worker_event(&self, worker: WorkerId, event: WorkerEvent) {
        match event {
            WorkerEvent::StatsSnapshot(snapshot) => {
                self.publisher.table.apply(worker, snapshot);
                let _ = self.debounced.call(());
            }
            other => self.forward(worker, other),
        }
    }

    /// Retire a worker's row and publish the new totals immediately
    pub fn on_worker_exit(&self, worker: WorkerId, exit: WorkerExit) {
        let removed = self.publisher.table.remove(worker);
        let aggregate = self.publisher.publish();

        match exit {
            WorkerExit::Clean => info!(%worker, "Worker exited"),
            WorkerExit::Crashed { reason } => {
                error!(
                    %worker,
                    lost_clients = removed.map_or(0, |s| s.clients_connected),
                    "Worker crashed: {}",
                    reason
                );
                self.forward(worker, WorkerEvent::error(format!("worker crashed: {}", reason)));
            }
        }
        debug!(clients_connected = aggregate.clients_connected, "Aggregate after exit");
    }

    fn forward(&self, worker: WorkerId, event: WorkerEvent) {
        let _ = self.events.send(TelemetryEvent { worker, event });
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("plan", &self.plan)
            .field("launcher", &self.launcher)
            .finish_non_exhaustive()
    }
}
