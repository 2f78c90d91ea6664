//! Coalescing call limiters
//!
//! [`Debounce`] collapses a burst of calls into one trailing invocation.
//! [`Throttle`] caps invocations at one per window, deferring the overflow
//! to the window boundary. Both hand each caller a [`Completion`] that
//! resolves with the result of the coalesced invocation that absorbed the
//! call, not of a call of its own.
//!
//! Timers are tokio tasks, so both limiters must be used from within a
//! tokio runtime.

mod debounce;
mod throttle;

pub use debounce::Debounce;
pub use throttle::Throttle;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

/// Default coalescing window
pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

type Callback<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// Result of the coalesced invocation a call was folded into
///
/// Resolves to `None` if the limiter was dropped before firing.
#[derive(Debug)]
#[must_use = "completions do nothing unless awaited; drop it to ignore the result"]
pub struct Completion<R> {
    rx: oneshot::Receiver<R>,
}

impl<R> Future for Completion<R> {
    type Output = Option<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// Callers waiting on the next invocation
#[derive(Debug)]
struct Waiters<R> {
    pending: Vec<oneshot::Sender<R>>,
}

impl<R: Clone> Waiters<R> {
    const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    fn register(&mut self) -> Completion<R> {
        let (tx, rx) = oneshot::channel();
        self.pending.push(tx);
        Completion { rx }
    }

    fn take(&mut self) -> Vec<oneshot::Sender<R>> {
        std::mem::take(&mut self.pending)
    }
}

/// Lock that outlives a panicking callback
///
/// A panic inside a user callback must not wedge every later call.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run the callback and notify every waiter folded into this invocation
fn fire<A, R: Clone>(callback: &Callback<A, R>, args: A, waiters: Vec<oneshot::Sender<R>>) {
    let result = callback(args);
    for waiter in waiters {
        let _ = waiter.send(result.clone());
    }
}
