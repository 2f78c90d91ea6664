//! Byte-counting decorator around a session
//!
//! Counts every outbound payload before it reaches the wrapped transport
//! and every inbound payload as it is pulled from the event stream.
//! Payload bytes, ordering and delivery are left exactly as the wrapped
//! transport provides them.

use super::{Outbound, Session, SessionEvent, TransportError};
use crate::metrics::WorkerStats;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound half that records `bytes_sent`
#[derive(Debug)]
pub struct InstrumentedOutbound {
    inner: Arc<dyn Outbound>,
    stats: WorkerStats,
}

impl InstrumentedOutbound {
    #[must_use]
    pub fn new(inner: Arc<dyn Outbound>, stats: WorkerStats) -> Self {
        Self { inner, stats }
    }
}

impl Outbound for InstrumentedOutbound {
    fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.stats.record_sent(payload.len() as u64);
        self.inner.send(payload)
    }

    fn close(&self) {
        self.inner.close();
    }
}

/// Inbound event stream that records `bytes_received`
#[derive(Debug)]
pub struct InstrumentedEvents {
    inner: mpsc::UnboundedReceiver<SessionEvent>,
    stats: WorkerStats,
}

impl InstrumentedEvents {
    #[must_use]
    pub fn new(inner: mpsc::UnboundedReceiver<SessionEvent>, stats: WorkerStats) -> Self {
        Self { inner, stats }
    }

    /// Next inbound event, `None` once the session is gone
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        let event = self.inner.recv().await?;
        if let Some(len) = event.payload_len() {
            self.stats.record_received(len as u64);
        }
        Some(event)
    }
}

/// A session with both directions instrumented
#[derive(Debug)]
pub struct InstrumentedSession {
    pub serializer_id: Option<String>,
    pub outbound: Arc<InstrumentedOutbound>,
    pub events: InstrumentedEvents,
}

/// Wrap a freshly opened session so its traffic is counted in `stats`
#[must_use]
pub fn instrument(session: Session, stats: &WorkerStats) -> InstrumentedSession {
    InstrumentedSession {
        serializer_id: session.serializer_id,
        outbound: Arc::new(InstrumentedOutbound::new(session.outbound, stats.clone())),
        events: InstrumentedEvents::new(session.events, stats.clone()),
    }
}
