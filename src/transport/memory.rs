//! In-memory loopback transport
//!
//! Opens sessions without touching the network. Used for `--transport
//! memory` dry runs and as the session client in tests: open latency,
//! rejected attempts, echo of sent payloads and server-side events can
//! all be scripted, and every opened session stays reachable through a
//! [`MemoryPeer`] handle.

use super::{JoinOptions, Outbound, Session, SessionEvent, Transport, TransportError};
use crate::types::TargetName;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Loopback transport
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Arc<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    open_latency: Duration,
    failing_attempts: HashSet<usize>,
    hanging_attempts: HashSet<usize>,
    serializer_id: Option<String>,
    echo: bool,
    attempts: AtomicUsize,
    peers: Mutex<Vec<MemoryPeer>>,
}

/// Builder for [`MemoryTransport`]
#[derive(Debug, Default)]
pub struct MemoryTransportBuilder {
    open_latency: Duration,
    failing_attempts: HashSet<usize>,
    hanging_attempts: HashSet<usize>,
    serializer_id: Option<String>,
    echo: bool,
}

impl MemoryTransportBuilder {
    /// Delay before each open attempt resolves
    #[must_use]
    pub fn open_latency(mut self, latency: Duration) -> Self {
        self.open_latency = latency;
        self
    }

    /// Reject the n-th open attempt (0-based, in call order)
    #[must_use]
    pub fn fail_attempt(mut self, attempt: usize) -> Self {
        self.failing_attempts.insert(attempt);
        self
    }

    /// Never resolve the n-th open attempt
    #[must_use]
    pub fn hang_attempt(mut self, attempt: usize) -> Self {
        self.hanging_attempts.insert(attempt);
        self
    }

    /// Serializer identity reported by every session
    #[must_use]
    pub fn serializer(mut self, id: impl Into<String>) -> Self {
        self.serializer_id = Some(id.into());
        self
    }

    /// Echo every sent payload back as an inbound message
    #[must_use]
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    #[must_use]
    pub fn build(self) -> MemoryTransport {
        MemoryTransport {
            inner: Arc::new(MemoryInner {
                open_latency: self.open_latency,
                failing_attempts: self.failing_attempts,
                hanging_attempts: self.hanging_attempts,
                serializer_id: self.serializer_id,
                echo: self.echo,
                attempts: AtomicUsize::new(0),
                peers: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl MemoryTransport {
    #[must_use]
    pub fn builder() -> MemoryTransportBuilder {
        MemoryTransportBuilder::default()
    }

    /// Configuration used by `--transport memory`
    #[must_use]
    pub fn dry_run() -> Self {
        Self::builder()
            .open_latency(Duration::from_millis(5))
            .serializer("memory")
            .echo(true)
            .build()
    }

    /// Number of open attempts made so far
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Handles to every session opened so far, in open order
    #[must_use]
    pub fn peers(&self) -> Vec<MemoryPeer> {
        self.inner
            .peers
            .lock()
            .map(|peers| peers.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open_session(
        &self,
        target: &TargetName,
        options: &JoinOptions,
    ) -> Result<Session, TransportError> {
        let attempt = self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.inner.open_latency.is_zero() {
            tokio::time::sleep(self.inner.open_latency).await;
        }
        if self.inner.hanging_attempts.contains(&attempt) {
            std::future::pending::<()>().await;
        }
        if self.inner.failing_attempts.contains(&attempt) {
            return Err(TransportError::Open(format!(
                "room '{}' rejected attempt {}",
                target, attempt
            )));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            inner: Arc::new(PeerInner {
                target: target.to_string(),
                options: options.clone(),
                events: events_tx,
                sent: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        };
        if let Ok(mut peers) = self.inner.peers.lock() {
            peers.push(peer.clone());
        }

        Ok(Session {
            serializer_id: self.inner.serializer_id.clone(),
            outbound: Arc::new(MemoryOutbound {
                peer: peer.clone(),
                echo: self.inner.echo,
            }),
            events: events_rx,
        })
    }
}

/// Server-side view of one loopback session
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    inner: Arc<PeerInner>,
}

#[derive(Debug)]
struct PeerInner {
    target: String,
    options: JoinOptions,
    events: mpsc::UnboundedSender<SessionEvent>,
    sent: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryPeer {
    /// Room the session joined
    #[must_use]
    pub fn target(&self) -> &str {
        &self.inner.target
    }

    /// Join options the session was opened with
    #[must_use]
    pub fn options(&self) -> &JoinOptions {
        &self.inner.options
    }

    /// Payloads the client sent, exactly as they reached the transport
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.inner
            .sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Whether the client closed the session
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Deliver an event to the client
    ///
    /// Returns false if the client side is gone.
    pub fn push(&self, event: SessionEvent) -> bool {
        self.inner.events.send(event).is_ok()
    }
}

#[derive(Debug)]
struct MemoryOutbound {
    peer: MemoryPeer,
    echo: bool,
}

impl Outbound for MemoryOutbound {
    fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.peer.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.echo {
            self.peer.push(SessionEvent::Message(payload.clone()));
        }
        if let Ok(mut sent) = self.peer.inner.sent.lock() {
            sent.push(payload);
        }
        Ok(())
    }

    /// Marks the peer closed and acknowledges with a normal leave
    fn close(&self) {
        if !self.peer.inner.closed.swap(true, Ordering::SeqCst) {
            self.peer.push(SessionEvent::Leave { code: Some(1000) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetName {
        TargetName::new("battle".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_open_records_peer() {
        let transport = MemoryTransport::builder().serializer("schema").build();
        let mut options = JoinOptions::new();
        options.insert("name".into(), "bot".into());

        let session = transport.open_session(&target(), &options).await.unwrap();
        assert_eq!(session.serializer_id.as_deref(), Some("schema"));

        let peers = transport.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].target(), "battle");
        assert_eq!(peers[0].options().get("name"), Some(&"bot".into()));
    }

    #[tokio::test]
    async fn test_failing_attempt() {
        let transport = MemoryTransport::builder().fail_attempt(1).build();
        let options = JoinOptions::new();

        assert!(transport.open_session(&target(), &options).await.is_ok());
        assert!(matches!(
            transport.open_session(&target(), &options).await,
            Err(TransportError::Open(_))
        ));
        assert!(transport.open_session(&target(), &options).await.is_ok());
        assert_eq!(transport.attempts(), 3);
        assert_eq!(transport.peers().len(), 2);
    }

    #[tokio::test]
    async fn test_echo_and_sent_log() {
        let transport = MemoryTransport::builder().echo(true).build();
        let mut session = transport
            .open_session(&target(), &JoinOptions::new())
            .await
            .unwrap();

        session.outbound.send(b"ping".to_vec()).unwrap();
        assert_eq!(
            session.events.recv().await,
            Some(SessionEvent::Message(b"ping".to_vec()))
        );
        assert_eq!(transport.peers()[0].sent(), vec![b"ping".to_vec()]);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let transport = MemoryTransport::default();
        let mut session = transport
            .open_session(&target(), &JoinOptions::new())
            .await
            .unwrap();

        session.outbound.close();
        session.outbound.close();
        assert!(transport.peers()[0].is_closed());
        assert_eq!(
            session.events.recv().await,
            Some(SessionEvent::Leave { code: Some(1000) })
        );
        assert!(session.events.try_recv().is_err());
        assert!(matches!(
            session.outbound.send(vec![1]),
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_latency() {
        let transport = MemoryTransport::builder()
            .open_latency(Duration::from_millis(250))
            .build();
        let start = tokio::time::Instant::now();
        transport
            .open_session(&target(), &JoinOptions::new())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
