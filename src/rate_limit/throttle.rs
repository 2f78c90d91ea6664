use super::{Callback, Completion, Waiters, fire, lock};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Leading-edge throttle with a coalesced trailing call
///
/// A call made once the window has elapsed fires immediately and opens a
/// new window. A call inside the window schedules a single invocation at
/// the window boundary; further calls before then replace its arguments.
/// The first call always fires immediately.
pub struct Throttle<A, R> {
    wait: Duration,
    callback: Callback<A, R>,
    state: Arc<Mutex<ThrottleState<A, R>>>,
}

struct ThrottleState<A, R> {
    generation: u64,
    last_fired: Option<Instant>,
    args: Option<A>,
    waiters: Waiters<R>,
    timer: Option<JoinHandle<()>>,
}

impl<A, R> Throttle<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    pub fn new<F>(wait: Duration, callback: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self {
            wait,
            callback: Arc::new(callback),
            state: Arc::new(Mutex::new(ThrottleState {
                generation: 0,
                last_fired: None,
                args: None,
                waiters: Waiters::new(),
                timer: None,
            })),
        }
    }

    #[must_use]
    #[inline]
    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn call(&self, args: A) -> Completion<R> {
        let now = Instant::now();
        let mut state = lock(&self.state);
        state.generation += 1;
        let completion = state.waiters.register();

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let window_end = state.last_fired.map(|at| at + self.wait);
        match window_end {
            Some(end) if end > now => {
                state.args = Some(args);
                let generation = state.generation;
                let shared = Arc::clone(&self.state);
                let callback = Arc::clone(&self.callback);
                state.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep_until(end).await;
                    let (args, waiters) = {
                        let mut state = lock(&shared);
                        if state.generation != generation {
                            return;
                        }
                        state.timer = None;
                        state.last_fired = Some(Instant::now());
                        (state.args.take(), state.waiters.take())
                    };
                    if let Some(args) = args {
                        fire(&callback, args, waiters);
                    }
                }));
            }
            _ => {
                state.last_fired = Some(now);
                state.args = None;
                let waiters = state.waiters.take();
                drop(state);
                fire(&self.callback, args, waiters);
            }
        }

        completion
    }

    /// Whether a trailing invocation is scheduled
    #[must_use]
    pub fn is_pending(&self) -> bool {
        lock(&self.state).args.is_some()
    }
}

impl<A, R> Drop for Throttle<A, R> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock()
            && let Some(timer) = state.timer.take()
        {
            timer.abort();
        }
    }
}

impl<A, R> std::fmt::Debug for Throttle<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle").field("wait", &self.wait).finish()
    }
}
