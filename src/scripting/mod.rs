//! Per-connection scripted behaviour
//!
//! A [`Scripting`] value is a set of optional lifecycle hooks. The
//! connection driver calls whichever hooks are present and skips the
//! rest. Hooks receive a [`SessionHandle`] for the connection they fire
//! on, which can send payloads and emit diagnostics.

pub mod builtin;

pub use builtin::{BUILTIN_SCRIPTS, resolve};

use crate::events::{EventSink, WorkerEvent};
use crate::transport::{InstrumentedOutbound, JoinOptions, Outbound, TransportError};
use futures::future::BoxFuture;
use std::sync::Arc;

type JoinOptionsHook = Arc<dyn Fn(usize) -> BoxFuture<'static, JoinOptions> + Send + Sync>;
type SessionHook = Arc<dyn Fn(&SessionHandle) + Send + Sync>;
type PayloadHook = Arc<dyn Fn(&SessionHandle, &[u8]) + Send + Sync>;
type LeaveHook = Arc<dyn Fn(&SessionHandle, Option<u16>) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&SessionHandle, &str) + Send + Sync>;

/// Optional lifecycle hooks bound to every connection of a worker
#[derive(Clone, Default)]
pub struct Scripting {
    request_join_options: Option<JoinOptionsHook>,
    on_join: Option<SessionHook>,
    on_message: Option<PayloadHook>,
    on_leave: Option<LeaveHook>,
    on_error: Option<ErrorHook>,
    on_state_change: Option<PayloadHook>,
}

impl Scripting {
    /// No hooks at all
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide join options per connection index
    #[must_use]
    pub fn request_join_options<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = JoinOptions> + Send + 'static,
    {
        self.request_join_options = Some(Arc::new(move |index| Box::pin(hook(index))));
        self
    }

    #[must_use]
    pub fn on_join(mut self, hook: impl Fn(&SessionHandle) + Send + Sync + 'static) -> Self {
        self.on_join = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_message(
        mut self,
        hook: impl Fn(&SessionHandle, &[u8]) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_leave(
        mut self,
        hook: impl Fn(&SessionHandle, Option<u16>) + Send + Sync + 'static,
    ) -> Self {
        self.on_leave = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(&SessionHandle, &str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_state_change(
        mut self,
        hook: impl Fn(&SessionHandle, &[u8]) + Send + Sync + 'static,
    ) -> Self {
        self.on_state_change = Some(Arc::new(hook));
        self
    }

    /// Join options for connection `index`, empty without a hook
    pub async fn join_options(&self, index: usize) -> JoinOptions {
        match &self.request_join_options {
            Some(hook) => hook(index).await,
            None => JoinOptions::new(),
        }
    }

    pub(crate) fn joined(&self, session: &SessionHandle) {
        if let Some(hook) = &self.on_join {
            hook(session);
        }
    }

    pub(crate) fn message(&self, session: &SessionHandle, payload: &[u8]) {
        if let Some(hook) = &self.on_message {
            hook(session, payload);
        }
    }

    pub(crate) fn left(&self, session: &SessionHandle, code: Option<u16>) {
        if let Some(hook) = &self.on_leave {
            hook(session, code);
        }
    }

    pub(crate) fn errored(&self, session: &SessionHandle, error: &str) {
        if let Some(hook) = &self.on_error {
            hook(session, error);
        }
    }

    pub(crate) fn state_changed(&self, session: &SessionHandle, state: &[u8]) {
        if let Some(hook) = &self.on_state_change {
            hook(session, state);
        }
    }

    /// Names of the hooks present, in lifecycle order
    #[must_use]
    pub fn hooks(&self) -> Vec<&'static str> {
        [
            ("requestJoinOptions", self.request_join_options.is_some()),
            ("onJoin", self.on_join.is_some()),
            ("onMessage", self.on_message.is_some()),
            ("onLeave", self.on_leave.is_some()),
            ("onError", self.on_error.is_some()),
            ("onStateChange", self.on_state_change.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

impl std::fmt::Debug for Scripting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scripting")
            .field("hooks", &self.hooks())
            .finish()
    }
}

/// What a hook can do with the connection it runs on
#[derive(Debug, Clone)]
pub struct SessionHandle {
    index: usize,
    outbound: Arc<InstrumentedOutbound>,
    sink: EventSink,
}

impl SessionHandle {
    pub(crate) fn new(index: usize, outbound: Arc<InstrumentedOutbound>, sink: EventSink) -> Self {
        Self {
            index,
            outbound,
            sink,
        }
    }

    /// Connection index within the worker
    #[must_use]
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Send a payload; counted in `bytes_sent`
    pub fn send(&self, payload: impl Into<Vec<u8>>) -> Result<(), TransportError> {
        self.outbound.send(payload.into())
    }

    /// Close the session from the client side
    pub fn close(&self) {
        self.outbound.close();
    }

    pub fn log(&self, message: impl Into<String>) {
        self.sink.log(message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.sink.warning(message);
    }

    /// Report an error tied to this connection
    pub fn error(&self, message: impl Into<String>) {
        self.sink
            .emit(WorkerEvent::connection_error(self.index, message));
    }
}
