//! WebSocket session client
//!
//! One WebSocket per session. The socket is split into a writer task fed
//! by an unbounded queue (so [`Outbound::send`] never blocks the caller)
//! and a reader task that turns frames into [`SessionEvent`]s.

use super::{JoinOptions, Outbound, Session, SessionEvent, Transport, TransportError};
use crate::types::{Endpoint, TargetName};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};
use url::Url;

const SUBPROTOCOL_HEADER: &str = "sec-websocket-protocol";

/// Transport that opens one WebSocket per session against a fixed endpoint
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    endpoint: Endpoint,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// URL for joining `target`: `{endpoint}/{target}?{options}`
    ///
    /// String option values are passed as-is, anything else as JSON.
    pub fn session_url(
        &self,
        target: &TargetName,
        options: &JoinOptions,
    ) -> Result<Url, TransportError> {
        let mut url = Url::parse(self.endpoint.as_str())?;
        let path = format!("{}/{}", url.path().trim_end_matches('/'), target.as_str());
        url.set_path(&path);

        if !options.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in options {
                match value {
                    serde_json::Value::String(s) => query.append_pair(key, s),
                    other => query.append_pair(key, &other.to_string()),
                };
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open_session(
        &self,
        target: &TargetName,
        options: &JoinOptions,
    ) -> Result<Session, TransportError> {
        let url = self.session_url(target, options)?;
        debug!(%url, "Opening websocket session");

        let (stream, response) = connect_async(url.as_str()).await?;
        let serializer_id = response
            .headers()
            .get(SUBPROTOCOL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let (mut write, mut read) = stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Outgoing>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(outgoing) = outgoing_rx.recv().await {
                let result = match outgoing {
                    Outgoing::Payload(payload) => write.send(Message::Binary(payload)).await,
                    Outgoing::Close => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                };
                if let Err(e) = result {
                    trace!("websocket writer stopped: {}", e);
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let event = match frame {
                    Ok(Message::Binary(payload)) => SessionEvent::Message(payload),
                    Ok(Message::Text(text)) => SessionEvent::Message(text.into_bytes()),
                    Ok(Message::Close(frame)) => {
                        let code = frame.map(|f| u16::from(f.code));
                        let _ = events_tx.send(SessionEvent::Leave { code });
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = events_tx.send(SessionEvent::Error(e.to_string()));
                        return;
                    }
                };
                if events_tx.send(event).is_err() {
                    return;
                }
            }
            let _ = events_tx.send(SessionEvent::Leave { code: None });
        });

        Ok(Session {
            serializer_id,
            outbound: std::sync::Arc::new(WsOutbound { tx: outgoing_tx }),
            events: events_rx,
        })
    }
}

#[derive(Debug)]
enum Outgoing {
    Payload(Vec<u8>),
    Close,
}

#[derive(Debug)]
struct WsOutbound {
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl Outbound for WsOutbound {
    fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.tx
            .send(Outgoing::Payload(payload))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        let _ = self.tx.send(Outgoing::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(endpoint: &str) -> WebSocketTransport {
        WebSocketTransport::new(Endpoint::new(endpoint.to_string()).unwrap())
    }

    fn target() -> TargetName {
        TargetName::new("battle".to_string()).unwrap()
    }

    #[test]
    fn test_session_url_appends_target() {
        let url = transport("ws://localhost:2567")
            .session_url(&target(), &JoinOptions::new())
            .unwrap();
        assert_eq!(url.as_str(), "ws://localhost:2567/battle");
    }

    #[test]
    fn test_session_url_keeps_endpoint_path() {
        let url = transport("wss://game.example.com/rooms/")
            .session_url(&target(), &JoinOptions::new())
            .unwrap();
        assert_eq!(url.as_str(), "wss://game.example.com/rooms/battle");
    }

    #[test]
    fn test_session_url_encodes_options() {
        let mut options = JoinOptions::new();
        options.insert("name".into(), "bot 1".into());
        options.insert("level".into(), 3.into());

        let url = transport("ws://localhost:2567")
            .session_url(&target(), &options)
            .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("name".to_string(), "bot 1".to_string())));
        assert!(pairs.contains(&("level".to_string(), "3".to_string())));
    }

    #[tokio::test]
    async fn test_open_against_closed_port_fails() {
        let result = transport("ws://127.0.0.1:9")
            .open_session(&target(), &JoinOptions::new())
            .await;
        assert!(matches!(result, Err(TransportError::WebSocket(_))));
    }
}
