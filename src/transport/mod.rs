//! Session transport capability
//!
//! The load generator treats the real-time client as an opaque capability:
//! open a session, send payloads, receive a stream of session events,
//! close. [`Transport`] is that seam. Two implementations ship with the
//! crate: a WebSocket client and an in-memory loopback used for dry runs
//! and tests. [`instrumented`] wraps either one to count bytes.

pub mod instrumented;
pub mod memory;
pub mod websocket;

pub use instrumented::{InstrumentedEvents, InstrumentedOutbound, InstrumentedSession, instrument};
pub use memory::{MemoryPeer, MemoryTransport, MemoryTransportBuilder};
pub use websocket::WebSocketTransport;

use crate::types::{Endpoint, TargetName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Join parameters sent with the open request
pub type JoinOptions = serde_json::Map<String, serde_json::Value>;

/// Errors raised by a transport
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The open attempt was rejected or could not complete
    #[error("failed to open session: {0}")]
    Open(String),

    /// The session is no longer accepting payloads
    #[error("session is closed")]
    Closed,

    #[error("invalid session url: {0}")]
    Url(#[from] url::ParseError),

    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

/// Something that happened on an open session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Inbound application payload
    Message(Vec<u8>),
    /// Inbound state synchronisation payload
    StateChange(Vec<u8>),
    /// Runtime failure after the session was established
    Error(String),
    /// The server closed the session
    Leave { code: Option<u16> },
}

impl SessionEvent {
    /// Length of the inbound payload carried by this event, if any
    #[must_use]
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            Self::Message(payload) | Self::StateChange(payload) => Some(payload.len()),
            Self::Error(_) | Self::Leave { .. } => None,
        }
    }
}

/// Outbound half of a session
///
/// `send` only queues the payload; delivery happens on the transport's
/// own writer, in call order.
pub trait Outbound: Send + Sync + std::fmt::Debug {
    fn send(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Ask the transport to close the session. Idempotent.
    fn close(&self);
}

/// A freshly opened session
#[derive(Debug)]
pub struct Session {
    /// Serializer identity negotiated with the server, if the transport exposes one
    pub serializer_id: Option<String>,
    pub outbound: Arc<dyn Outbound>,
    /// Inbound events; the stream ending means the session is gone
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Capability to open sessions against one endpoint
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn open_session(
        &self,
        target: &TargetName,
        options: &JoinOptions,
    ) -> Result<Session, TransportError>;
}

/// Which transport implementation to use
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// WebSocket client against the configured endpoint
    #[default]
    Ws,
    /// In-memory echo loopback, no network traffic
    Memory,
}

impl TransportKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Memory => "memory",
        }
    }

    /// Build the transport for an endpoint
    #[must_use]
    pub fn build(&self, endpoint: &Endpoint) -> Arc<dyn Transport> {
        match self {
            Self::Ws => Arc::new(WebSocketTransport::new(endpoint.clone())),
            Self::Memory => Arc::new(MemoryTransport::dry_run()),
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_len() {
        assert_eq!(SessionEvent::Message(vec![0; 12]).payload_len(), Some(12));
        assert_eq!(SessionEvent::StateChange(vec![1, 2]).payload_len(), Some(2));
        assert_eq!(SessionEvent::Leave { code: None }.payload_len(), None);
        assert_eq!(SessionEvent::Error("x".into()).payload_len(), None);
    }

    #[test]
    fn test_transport_kind_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            transport: TransportKind,
        }
        let parsed: Wrapper = toml::from_str(r#"transport = "memory""#).unwrap();
        assert_eq!(parsed.transport, TransportKind::Memory);
        assert_eq!(TransportKind::default(), TransportKind::Ws);
    }
}
