//! Connection driver
//!
//! Opens a worker's share of sessions, one attempt per index, pacing the
//! *start* of each attempt by the configured delay. Attempts run as
//! independent tasks, so a slow join never holds back the next attempt.
//! Each joined session is instrumented for byte counting and bound to
//! the worker's scripting hooks.

mod record;

pub use record::{ConnectionRecord, ConnectionState};

use crate::events::{EventSink, WorkerEvent};
use crate::metrics::WorkerStats;
use crate::runtime::shutdown_requested;
use crate::scripting::{Scripting, SessionHandle};
use crate::transport::{
    InstrumentedSession, JoinOptions, Outbound, SessionEvent, Transport, instrument,
};
use crate::types::{ClientCount, TargetName};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::debug;

/// A connection task died instead of returning its record
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("connection task panicked: {0}")]
    Panicked(String),

    #[error("connection task cancelled")]
    Cancelled,
}

impl From<JoinError> for DriverError {
    fn from(e: JoinError) -> Self {
        if e.is_panic() {
            let payload = e.into_panic();
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Self::Panicked(reason)
        } else {
            Self::Cancelled
        }
    }
}

/// Everything a connection task needs, shared by all of them
#[derive(Debug)]
struct DriverContext {
    target: TargetName,
    transport: Arc<dyn Transport>,
    scripting: Scripting,
    stats: WorkerStats,
    sink: EventSink,
}

/// Drives one worker's connections
#[derive(Debug)]
pub struct ConnectionDriver {
    clients: ClientCount,
    open_delay: Duration,
    ctx: Arc<DriverContext>,
}

impl ConnectionDriver {
    #[must_use]
    pub fn new(
        target: TargetName,
        clients: ClientCount,
        transport: Arc<dyn Transport>,
        scripting: Scripting,
        stats: WorkerStats,
        sink: EventSink,
    ) -> Self {
        Self {
            clients,
            open_delay: Duration::ZERO,
            ctx: Arc::new(DriverContext {
                target,
                transport,
                scripting,
                stats,
                sink,
            }),
        }
    }

    /// Delay between the start of consecutive open attempts
    #[must_use]
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Open every connection and wait for all of them to finish
    ///
    /// Returns once every session has ended or shutdown was requested and
    /// every task has wound down. Records come back in index order; an
    /// attempt never started because of shutdown has no record.
    ///
    /// # Errors
    /// A connection task that panics (typically a scripting hook) aborts
    /// the remaining tasks and fails the whole run.
    pub async fn run(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<ConnectionRecord>, DriverError> {
        let total = self.clients.get();
        let mut tasks = JoinSet::new();
        let mut records = Vec::with_capacity(total);

        for index in 0..total {
            if *shutdown.borrow() {
                break;
            }

            let options = tokio::select! {
                options = self.ctx.scripting.join_options(index) => options,
                _ = shutdown_requested(&mut shutdown) => break,
            };

            tasks.spawn(drive_connection(
                index,
                options,
                Arc::clone(&self.ctx),
                shutdown.clone(),
            ));

            while let Some(result) = tasks.try_join_next() {
                collect(result, &mut records, &mut tasks)?;
            }

            if !self.open_delay.is_zero() && index + 1 < total {
                tokio::select! {
                    _ = tokio::time::sleep(self.open_delay) => {}
                    _ = shutdown_requested(&mut shutdown) => break,
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            collect(result, &mut records, &mut tasks)?;
        }

        records.sort_by_key(ConnectionRecord::index);
        Ok(records)
    }
}

fn collect(
    result: Result<ConnectionRecord, JoinError>,
    records: &mut Vec<ConnectionRecord>,
    tasks: &mut JoinSet<ConnectionRecord>,
) -> Result<(), DriverError> {
    match result {
        Ok(record) => {
            records.push(record);
            Ok(())
        }
        Err(e) => {
            tasks.abort_all();
            Err(e.into())
        }
    }
}

/// One session attempt from open to end
async fn drive_connection(
    index: usize,
    options: JoinOptions,
    ctx: Arc<DriverContext>,
    mut shutdown: watch::Receiver<bool>,
) -> ConnectionRecord {
    let mut record = ConnectionRecord::new(index);
    record.start_connecting();
    debug!(connection = index, "Opening session");

    let opened = tokio::select! {
        opened = ctx.transport.open_session(&ctx.target, &options) => opened,
        _ = shutdown_requested(&mut shutdown) => {
            debug!(connection = index, "Abandoning open attempt on shutdown");
            return record;
        }
    };

    let session = match opened {
        Ok(session) => session,
        Err(e) => {
            record.mark_errored();
            debug!(connection = index, "Failed to join: {}", e);
            ctx.sink.emit(WorkerEvent::session_failure(index, e.to_string()));
            return record;
        }
    };

    record.mark_joined();
    ctx.stats.client_joined();
    if let Some(serializer) = &session.serializer_id {
        ctx.sink.emit(WorkerEvent::SerializerInfo {
            serializer: serializer.clone(),
        });
    }

    let InstrumentedSession {
        outbound,
        mut events,
        ..
    } = instrument(session, &ctx.stats);
    let handle = SessionHandle::new(index, Arc::clone(&outbound), ctx.sink.clone());
    ctx.scripting.joined(&handle);

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown_requested(&mut shutdown) => {
                outbound.close();
                if record.mark_left() {
                    ctx.stats.client_departed();
                }
                break;
            }
        };

        match event {
            Some(SessionEvent::Message(payload)) => ctx.scripting.message(&handle, &payload),
            Some(SessionEvent::StateChange(state)) => {
                ctx.scripting.state_changed(&handle, &state);
            }
            Some(SessionEvent::Error(message)) => {
                if record.mark_errored() {
                    ctx.stats.client_departed();
                    ctx.sink
                        .emit(WorkerEvent::session_failure(index, message.clone()));
                }
                ctx.scripting.errored(&handle, &message);
            }
            Some(SessionEvent::Leave { code }) => {
                if record.mark_left() {
                    ctx.stats.client_departed();
                }
                ctx.scripting.left(&handle, code);
                break;
            }
            None => {
                if record.mark_left() {
                    ctx.stats.client_departed();
                }
                break;
            }
        }
    }

    debug!(connection = index, state = ?record.state(), "Session finished");
    record
}
