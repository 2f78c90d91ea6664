//! Worker: one isolated unit running a connection driver
//!
//! A worker owns exactly one [`ConnectionDriver`] and one [`WorkerStats`].
//! It reports a copy of its counters on a fixed interval and forwards
//! diagnostics as events; it never writes to a shared console.
//!
//! Workers run either as child processes of the coordinator
//! ([`ProcessLauncher`], the default) or as tokio tasks inside it
//! ([`TaskLauncher`]).

pub mod capture;
pub mod launcher;
pub mod process;

pub use capture::EventMakeWriter;
pub use launcher::{
    LaunchError, ProcessLauncher, TaskLauncher, WorkerExit, WorkerLauncher, WorkerMessage,
    WorkerMessageKind,
};

use crate::driver::{ConnectionDriver, ConnectionState, DriverError};
use crate::events::{EventSink, WorkerEvent};
use crate::metrics::{StatsSnapshot, WorkerStats};
use crate::plan::WorkerAssignment;
use crate::scripting::{self, Scripting};
use crate::transport::Transport;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Why a worker stopped abnormally
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("unknown script '{0}'")]
    UnknownScript(String),

    #[error("worker crashed: {0}")]
    Crashed(#[from] DriverError),
}

/// Resolve the transport and scripting hooks an assignment asks for
///
/// # Errors
/// Returns [`WorkerError::UnknownScript`] if the script is not built in.
pub fn prepare(
    assignment: &WorkerAssignment,
) -> Result<(Arc<dyn Transport>, Scripting), WorkerError> {
    let scripting = scripting::resolve(&assignment.script)
        .ok_or_else(|| WorkerError::UnknownScript(assignment.script.clone()))?;
    Ok((assignment.transport.build(&assignment.endpoint), scripting))
}

/// Run one worker to completion
///
/// Emits a `stats-snapshot` every `report_interval`, starting immediately,
/// and a final one when the driver finishes. Returns the final counters.
///
/// # Errors
/// Returns [`WorkerError::Crashed`] if a connection task panicked.
pub async fn run(
    assignment: WorkerAssignment,
    transport: Arc<dyn Transport>,
    scripting: Scripting,
    sink: EventSink,
    shutdown: watch::Receiver<bool>,
) -> Result<StatsSnapshot, WorkerError> {
    let stats = WorkerStats::new();
    info!(
        worker = %assignment.worker_id,
        clients = assignment.clients.get(),
        target = %assignment.target,
        "Worker starting"
    );

    let driver = ConnectionDriver::new(
        assignment.target.clone(),
        assignment.clients,
        transport,
        scripting,
        stats.clone(),
        sink.clone(),
    )
    .with_open_delay(assignment.open_delay);
    let driver = driver.run(shutdown);
    tokio::pin!(driver);

    let mut report = tokio::time::interval(assignment.report_interval);
    report.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let outcome = loop {
        tokio::select! {
            outcome = &mut driver => break outcome,
            _ = report.tick() => {
                sink.emit(WorkerEvent::StatsSnapshot(stats.snapshot()));
            }
        }
    };

    let last = stats.snapshot();
    sink.emit(WorkerEvent::StatsSnapshot(last));

    let records = outcome?;
    let joined = records
        .iter()
        .filter(|r| r.state() != ConnectionState::Errored)
        .count();
    debug!(
        worker = %assignment.worker_id,
        attempted = records.len(),
        joined,
        "Worker finished"
    );
    Ok(last)
}
