//! Starting workers and supervising them until they exit
//!
//! A [`WorkerLauncher`] starts one worker for an assignment and then,
//! from a supervising task, forwards everything the worker says as
//! [`WorkerMessage`]s. The last message for a worker is always exactly
//! one [`WorkerMessageKind::Exited`], after all of its events.

use super::{WorkerError, prepare};
use crate::events::{EventSink, WorkerEvent, decode_line};
use crate::plan::WorkerAssignment;
use crate::runtime::shutdown_requested;
use crate::scripting::Scripting;
use crate::transport::Transport;
use crate::types::WorkerId;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Time a worker process gets to exit after shutdown before it is killed
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Failure to start a worker
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("failed to encode assignment: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker process has no {0} pipe")]
    MissingPipe(&'static str),
}

/// How a worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    Clean,
    Crashed { reason: String },
}

impl WorkerExit {
    #[must_use]
    pub const fn is_crash(&self) -> bool {
        matches!(self, Self::Crashed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessageKind {
    Event(WorkerEvent),
    Exited(WorkerExit),
}

/// Something a worker said, tagged with the slot it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerMessage {
    pub worker: WorkerId,
    pub kind: WorkerMessageKind,
}

impl WorkerMessage {
    #[must_use]
    pub const fn event(worker: WorkerId, event: WorkerEvent) -> Self {
        Self {
            worker,
            kind: WorkerMessageKind::Event(event),
        }
    }

    #[must_use]
    pub const fn exited(worker: WorkerId, exit: WorkerExit) -> Self {
        Self {
            worker,
            kind: WorkerMessageKind::Exited(exit),
        }
    }
}

/// Starts workers
#[async_trait]
pub trait WorkerLauncher: Send + Sync + std::fmt::Debug {
    /// Start a worker for `assignment`
    ///
    /// Returns once the worker is running. Its messages, ending with the
    /// exit notice, are delivered on `messages`.
    async fn launch(
        &self,
        assignment: WorkerAssignment,
        shutdown: watch::Receiver<bool>,
        messages: mpsc::UnboundedSender<WorkerMessage>,
    ) -> Result<(), LaunchError>;
}

// ============================================================================
// In-process workers
// ============================================================================

/// Runs workers as tokio tasks inside the coordinator
///
/// A panicking worker task is reported as a crash; it cannot take the
/// coordinator down, but workers share the process and its memory.
#[derive(Debug, Clone, Default)]
pub struct TaskLauncher {
    transport: Option<Arc<dyn Transport>>,
    scripting: Option<Scripting>,
}

impl TaskLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this transport instead of the one named in the assignment
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use these hooks instead of the script named in the assignment
    #[must_use]
    pub fn with_scripting(mut self, scripting: Scripting) -> Self {
        self.scripting = Some(scripting);
        self
    }
}

#[async_trait]
impl WorkerLauncher for TaskLauncher {
    async fn launch(
        &self,
        assignment: WorkerAssignment,
        shutdown: watch::Receiver<bool>,
        messages: mpsc::UnboundedSender<WorkerMessage>,
    ) -> Result<(), LaunchError> {
        let worker = assignment.worker_id;
        let (default_transport, default_scripting) = prepare(&assignment)?;
        let transport = self.transport.clone().unwrap_or(default_transport);
        let scripting = self.scripting.clone().unwrap_or(default_scripting);

        let (sink, mut events) = EventSink::channel();
        let mut handle = tokio::spawn(super::run(
            assignment, transport, scripting, sink, shutdown,
        ));

        tokio::spawn(async move {
            let outcome = loop {
                tokio::select! {
                    biased;
                    Some(event) = events.recv() => {
                        let _ = messages.send(WorkerMessage::event(worker, event));
                    }
                    outcome = &mut handle => break outcome,
                }
            };
            while let Ok(event) = events.try_recv() {
                let _ = messages.send(WorkerMessage::event(worker, event));
            }

            let exit = match outcome {
                Ok(Ok(_)) => WorkerExit::Clean,
                Ok(Err(e)) => WorkerExit::Crashed {
                    reason: e.to_string(),
                },
                Err(e) => WorkerExit::Crashed {
                    reason: join_failure(e),
                },
            };
            let _ = messages.send(WorkerMessage::exited(worker, exit));
        });

        Ok(())
    }
}

fn join_failure(e: JoinError) -> String {
    if e.is_panic() {
        let payload = e.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| format!("panicked: {}", s))
            .or_else(|| payload.downcast_ref::<String>().map(|s| format!("panicked: {}", s)))
            .unwrap_or_else(|| "panicked".to_string())
    } else {
        "cancelled".to_string()
    }
}

// ============================================================================
// Process workers
// ============================================================================

/// Runs each worker as a child process of the current executable
///
/// The child is started as `<program> worker --assignment <json>`. Its
/// stdout carries one JSON event per line; every stderr line becomes an
/// `error` event. Closing the child's stdin asks it to shut down.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    grace: Duration,
}

impl ProcessLauncher {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            grace: SHUTDOWN_GRACE,
        }
    }

    /// Launcher that re-executes the running binary
    ///
    /// # Errors
    /// Returns an error if the current executable cannot be determined
    pub fn current_exe() -> Result<Self, LaunchError> {
        Ok(Self::new(std::env::current_exe()?))
    }

    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn command(&self, assignment: &WorkerAssignment) -> Result<Command, LaunchError> {
        let mut command = Command::new(&self.program);
        command
            .arg("worker")
            .arg("--assignment")
            .arg(serde_json::to_string(assignment)?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(command)
    }
}

#[async_trait]
impl WorkerLauncher for ProcessLauncher {
    async fn launch(
        &self,
        assignment: WorkerAssignment,
        shutdown: watch::Receiver<bool>,
        messages: mpsc::UnboundedSender<WorkerMessage>,
    ) -> Result<(), LaunchError> {
        let worker = assignment.worker_id;
        let mut child = self.command(&assignment)?.spawn()?;
        debug!(%worker, pid = ?child.id(), "Worker process spawned");

        let stdin = child.stdin.take().ok_or(LaunchError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(LaunchError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(LaunchError::MissingPipe("stderr"))?;

        let grace = self.grace;
        tokio::spawn(async move {
            let exit = supervise(
                worker,
                child,
                stdin,
                BufReader::new(stdout),
                BufReader::new(stderr),
                shutdown,
                grace,
                &messages,
            )
            .await;
            let _ = messages.send(WorkerMessage::exited(worker, exit));
        });

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn supervise(
    worker: WorkerId,
    mut child: Child,
    stdin: tokio::process::ChildStdin,
    stdout: BufReader<tokio::process::ChildStdout>,
    stderr: BufReader<tokio::process::ChildStderr>,
    mut shutdown: watch::Receiver<bool>,
    grace: Duration,
    messages: &mpsc::UnboundedSender<WorkerMessage>,
) -> WorkerExit {
    let mut stdin = Some(stdin);
    let mut stdout = stdout.lines();
    let mut stderr = stderr.lines();
    let mut stdout_open = true;
    let mut stderr_open = true;
    let mut kill_at: Option<Instant> = None;

    while stdout_open || stderr_open {
        tokio::select! {
            line = stdout.next_line(), if stdout_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    let event = decode_line(&line).unwrap_or_else(|e| {
                        WorkerEvent::warning(format!("unreadable worker output ({}): {}", e, line))
                    });
                    let _ = messages.send(WorkerMessage::event(worker, event));
                }
                Ok(None) | Err(_) => stdout_open = false,
            },
            line = stderr.next_line(), if stderr_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    let _ = messages.send(WorkerMessage::event(worker, WorkerEvent::error(line)));
                }
                Ok(None) | Err(_) => stderr_open = false,
            },
            _ = shutdown_requested(&mut shutdown), if stdin.is_some() => {
                debug!(%worker, "Asking worker process to stop");
                drop(stdin.take());
                kill_at = Some(Instant::now() + grace);
            }
            _ = tokio::time::sleep_until(kill_at.unwrap_or_else(Instant::now)), if kill_at.is_some() => {
                warn!(%worker, "Worker process did not stop in time, killing it");
                let _ = child.start_kill();
                kill_at = None;
            }
        }
    }

    let status = match kill_at {
        Some(deadline) => match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                let _ = child.start_kill();
                child.wait().await
            }
        },
        None => child.wait().await,
    };

    match status {
        Ok(status) => exit_from_status(status),
        Err(e) => WorkerExit::Crashed {
            reason: format!("failed to reap worker process: {}", e),
        },
    }
}

fn exit_from_status(status: ExitStatus) -> WorkerExit {
    if status.success() {
        WorkerExit::Clean
    } else {
        WorkerExit::Crashed {
            reason: format!("worker process exited with {}", status),
        }
    }
}
