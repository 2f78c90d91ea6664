use super::{Callback, Completion, Waiters, fire, lock};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Trailing-edge debounce
///
/// Every call restarts the timer. The callback fires once `wait` has
/// elapsed without another call, with the arguments of the last call.
///
/// # Examples
/// ```no_run
/// use room_loadtest::rate_limit::Debounce;
/// use std::time::Duration;
///
/// # async fn demo() {
/// let publish = Debounce::new(Duration::from_millis(100), |n: u64| n * 2);
/// let first = publish.call(1);
/// let second = publish.call(2);
/// assert_eq!(first.await, Some(4));
/// assert_eq!(second.await, Some(4));
/// # }
/// ```
pub struct Debounce<A, R> {
    wait: Duration,
    callback: Callback<A, R>,
    state: Arc<Mutex<DebounceState<A, R>>>,
}

struct DebounceState<A, R> {
    generation: u64,
    args: Option<A>,
    waiters: Waiters<R>,
    timer: Option<JoinHandle<()>>,
}

impl<A, R> Debounce<A, R>
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
            state: Arc::new(Mutex::new(DebounceState {
                generation: 0,
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

    /// Schedule the callback, replacing any pending invocation
    pub fn call(&self, args: A) -> Completion<R> {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.args = Some(args);
        let completion = state.waiters.register();

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let generation = state.generation;
        let wait = self.wait;
        let shared = Arc::clone(&self.state);
        let callback = Arc::clone(&self.callback);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let (args, waiters) = {
                let mut state = lock(&shared);
                // superseded while waiting for the lock
                if state.generation != generation {
                    return;
                }
                state.timer = None;
                (state.args.take(), state.waiters.take())
            };
            if let Some(args) = args {
                fire(&callback, args, waiters);
            }
        }));

        completion
    }

    /// Whether an invocation is scheduled
    #[must_use]
    pub fn is_pending(&self) -> bool {
        lock(&self.state).args.is_some()
    }
}

impl<A, R> Drop for Debounce<A, R> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock()
            && let Some(timer) = state.timer.take()
        {
            timer.abort();
        }
    }
}

impl<A, R> std::fmt::Debug for Debounce<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounce").field("wait", &self.wait).finish()
    }
}
