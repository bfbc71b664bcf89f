//! One-shot command futures.
//!
//! A [`CommandFuture`] settles exactly once, through any clone of its
//! [`Resolver`]. Continuations are attached with [`CommandFuture::then`] or
//! [`CommandFuture::on_settle`] and run on whichever thread settles the
//! future, or immediately on the caller when it has already settled.
//!
//! ```
//! use playbox_core::CommandFuture;
//!
//! let (resolver, future) = CommandFuture::<u32, String>::new();
//! let doubled = future.then(|n| CommandFuture::resolved(n * 2));
//!
//! assert!(resolver.resolve(21));
//! assert!(!resolver.reject("too late".to_string()));
//! assert_eq!(doubled.wait(), Ok(42));
//! ```

use std::any::Any;
use std::fmt;
use std::io;
use std::mem;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

/// Name given to threads started by [`CommandFuture::spawn`].
pub const STEP_THREAD_NAME: &str = "playbox-step";

const DEADLINE_THREAD_NAME: &str = "playbox-deadline";

type Continuation<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

enum State<T, E> {
    Pending,
    Waiting(Continuation<T, E>),
    Settled(Result<T, E>),
    /// Settled and handed to its consumer.
    Taken,
}

impl<T, E> State<T, E> {
    fn is_pending(&self) -> bool {
        matches!(self, Self::Pending | Self::Waiting(_))
    }
}

struct Shared<T, E> {
    state: Mutex<State<T, E>>,
    settled: Condvar,
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The deadline given to [`CommandFuture::with_deadline`] passed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    after: Duration,
}

impl Elapsed {
    /// The deadline that was exceeded.
    #[must_use]
    pub fn after(&self) -> Duration {
        self.after
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deadline of {:?} elapsed", self.after)
    }
}

impl std::error::Error for Elapsed {}

/// The closure given to [`CommandFuture::spawn`] panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panicked {
    message: String,
}

impl Panicked {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self { message }
    }

    /// The panic message, when it was a string.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step panicked: {}", self.message)
    }
}

impl std::error::Error for Panicked {}

/// Settles the paired [`CommandFuture`].
///
/// Clones share one settlement: the first `resolve`, `reject` or `settle`
/// call wins and later calls return `false`.
pub struct Resolver<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T, E> Resolver<T, E> {
    /// Settles with `Ok(value)`.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settles with `Err(error)`.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    /// Settles with `result`. Returns `false` if the future had already
    /// settled, in which case `result` is dropped.
    ///
    /// A continuation attached earlier runs on this thread before `settle`
    /// returns.
    pub fn settle(&self, result: Result<T, E>) -> bool {
        let mut state = lock(&self.shared.state);
        match mem::replace(&mut *state, State::Taken) {
            State::Pending => {
                *state = State::Settled(result);
                drop(state);
                self.shared.settled.notify_all();
                true
            }
            State::Waiting(continuation) => {
                drop(state);
                self.shared.settled.notify_all();
                continuation(result);
                true
            }
            done => {
                *state = done;
                false
            }
        }
    }

    /// Returns `true` once any clone has settled the future.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !lock(&self.shared.state).is_pending()
    }
}

/// Result of a command that may still be running.
///
/// Consumed by exactly one of [`then`](Self::then),
/// [`on_settle`](Self::on_settle) or [`wait`](Self::wait).
#[must_use = "a future does nothing unless consumed"]
pub struct CommandFuture<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> fmt::Debug for CommandFuture<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = lock(&self.shared.state).is_pending();
        f.debug_struct("CommandFuture")
            .field("pending", &pending)
            .finish()
    }
}

impl<T, E> CommandFuture<T, E> {
    /// Creates a pending future and its resolver.
    pub fn new() -> (Resolver<T, E>, Self) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::Pending),
            settled: Condvar::new(),
        });
        (
            Resolver {
                shared: Arc::clone(&shared),
            },
            Self { shared },
        )
    }

    /// An already resolved future.
    pub fn resolved(value: T) -> Self {
        let (resolver, future) = Self::new();
        resolver.resolve(value);
        future
    }

    /// An already rejected future.
    pub fn rejected(error: E) -> Self {
        let (resolver, future) = Self::new();
        resolver.reject(error);
        future
    }

    /// Blocks the calling thread until the future settles.
    pub fn wait(self) -> Result<T, E> {
        let mut state = lock(&self.shared.state);
        loop {
            match mem::replace(&mut *state, State::Taken) {
                State::Settled(result) => return result,
                other => {
                    *state = other;
                    state = self
                        .shared
                        .settled
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}

impl<T: Send + 'static, E: Send + 'static> CommandFuture<T, E> {
    /// Calls `f` with the result once the future settles.
    ///
    /// Runs `f` on the current thread if the future has already settled;
    /// never blocks otherwise.
    pub fn on_settle<F>(self, f: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        let mut state = lock(&self.shared.state);
        match mem::replace(&mut *state, State::Taken) {
            State::Pending => *state = State::Waiting(Box::new(f)),
            State::Settled(result) => {
                drop(state);
                f(result);
            }
            // Only one consumer exists, so nothing else can be waiting.
            other => *state = other,
        }
    }

    /// Chains a dependent step.
    ///
    /// On success, `f` receives the value and the returned future follows
    /// the future `f` produces. On failure, `f` is never called and the
    /// returned future rejects with the same error.
    pub fn then<U, F>(self, f: F) -> CommandFuture<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> CommandFuture<U, E> + Send + 'static,
    {
        let (resolver, chained) = CommandFuture::new();
        self.on_settle(move |result| match result {
            Ok(value) => f(value).on_settle(move |next| {
                resolver.settle(next);
            }),
            Err(error) => {
                resolver.reject(error);
            }
        });
        chained
    }

    /// Runs `f` on a new thread named [`STEP_THREAD_NAME`] and settles with
    /// its result.
    ///
    /// If the thread cannot be started the future rejects with the spawn
    /// error; if `f` panics it rejects with [`Panicked`].
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<io::Error> + From<Panicked>,
    {
        let (resolver, future) = Self::new();
        let worker = resolver.clone();
        let spawned = thread::Builder::new()
            .name(STEP_THREAD_NAME.to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(f))
                    .unwrap_or_else(|payload| Err(E::from(Panicked::from_payload(&*payload))));
                worker.settle(result);
            });
        if let Err(e) = spawned {
            resolver.reject(E::from(e));
        }
        future
    }

    /// Rejects with `E::from(Elapsed)` if the future is still pending after
    /// `deadline`.
    ///
    /// The underlying work keeps running; only the returned future stops
    /// waiting for it.
    pub fn with_deadline(self, deadline: Duration) -> Self
    where
        E: From<Elapsed> + From<io::Error>,
    {
        let (resolver, limited) = Self::new();
        let timer = resolver.clone();
        let shared = Arc::clone(&limited.shared);

        let spawned = thread::Builder::new()
            .name(DEADLINE_THREAD_NAME.to_string())
            .spawn(move || {
                let state = lock(&shared.state);
                let (state, outcome) = shared
                    .settled
                    .wait_timeout_while(state, deadline, |state| state.is_pending())
                    .unwrap_or_else(PoisonError::into_inner);
                drop(state);
                if outcome.timed_out() {
                    timer.reject(E::from(Elapsed { after: deadline }));
                }
            });

        match spawned {
            Ok(_) => self.on_settle(move |result| {
                resolver.settle(result);
            }),
            Err(e) => {
                resolver.reject(E::from(e));
            }
        }
        limited
    }
}
