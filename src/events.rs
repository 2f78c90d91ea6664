//! Events flowing from workers to the coordinator
//!
//! Workers never write to a shared console. Everything they want to say,
//! stats included, travels as a [`WorkerEvent`]. Process workers encode
//! one event per line of JSON on stdout; in-process workers hand the
//! values over a channel directly.

use crate::metrics::StatsSnapshot;
use crate::types::WorkerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// A single message from a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerEvent {
    /// Periodic copy of the worker's counters
    StatsSnapshot(StatsSnapshot),
    Log {
        message: String,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
        /// Connection index the error belongs to, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connection: Option<usize>,
        /// The session itself failed: a rejected join or a transport error
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        session_failed: bool,
    },
    /// Serializer negotiated by a freshly joined session
    SerializerInfo {
        serializer: String,
    },
}

/// Severity of a diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl WorkerEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            connection: None,
            session_failed: false,
        }
    }

    /// Error reported about a connection that is otherwise still alive
    pub fn connection_error(index: usize, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            connection: Some(index),
            session_failed: false,
        }
    }

    /// A session that could not join, or that the transport broke
    pub fn session_failure(index: usize, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            connection: Some(index),
            session_failed: true,
        }
    }

    /// Severity for diagnostic events, `None` for stats and serializer info
    #[must_use]
    pub const fn severity(&self) -> Option<Severity> {
        match self {
            Self::Log { .. } => Some(Severity::Info),
            Self::Warning { .. } => Some(Severity::Warning),
            Self::Error { .. } => Some(Severity::Error),
            Self::StatsSnapshot(_) | Self::SerializerInfo { .. } => None,
        }
    }

    /// Whether this is an error event
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Whether this error marks a failed session
    #[must_use]
    pub const fn is_session_failure(&self) -> bool {
        matches!(
            self,
            Self::Error {
                session_failed: true,
                ..
            }
        )
    }
}

/// Sending side of a worker's event stream
///
/// Cheap to clone. Emitting after the receiver is gone is a no-op, so
/// connection tasks never fail because the worker is shutting down.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl EventSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<WorkerEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end of its stream
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false if nobody is listening anymore
    pub fn emit(&self, event: WorkerEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(WorkerEvent::log(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(WorkerEvent::warning(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(WorkerEvent::error(message));
    }
}

/// An event as seen by the presentation layer, tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub worker: WorkerId,
    pub event: WorkerEvent,
}

impl std::fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.event {
            WorkerEvent::StatsSnapshot(s) => write!(
                f,
                "[{}] stats: {} connected, {} B in, {} B out",
                self.worker, s.clients_connected, s.bytes_received, s.bytes_sent
            ),
            WorkerEvent::Log { message } | WorkerEvent::Warning { message } => {
                write!(f, "[{}] {}", self.worker, message)
            }
            WorkerEvent::Error {
                message,
                connection: Some(index),
                ..
            } => write!(f, "[{}] client #{}: {}", self.worker, index, message),
            WorkerEvent::Error {
                message,
                connection: None,
                ..
            } => write!(f, "[{}] {}", self.worker, message),
            WorkerEvent::SerializerInfo { serializer } => {
                write!(f, "[{}] serializer: {}", self.worker, serializer)
            }
        }
    }
}

/// Failure decoding a line of the worker event stream
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed event line: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encode an event as a single line of JSON (no trailing newline)
pub fn encode_line(event: &WorkerEvent) -> Result<String, WireError> {
    Ok(serde_json::to_string(event)?)
}

/// Decode one line of the worker event stream
pub fn decode_line(line: &str) -> Result<WorkerEvent, WireError> {
    Ok(serde_json::from_str(line.trim())?)
}
