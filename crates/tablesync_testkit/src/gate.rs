//! One-shot completion rendezvous.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// The wait was abandoned before the signal fired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("completion gate timed out after {0:?}")]
pub struct GateTimedOut(pub Duration);

#[derive(Default)]
struct GateInner {
    done: Mutex<bool>,
    cond: Condvar,
}

/// A one-shot rendezvous between a test and an asynchronous completion.
///
/// The test hands a [`CompletionSignal`] to work that completes on some
/// other execution context, then blocks in
/// [`run_to_completion`](CompletionGate::run_to_completion) until the
/// signal fires. The wait is bounded so a completion that never arrives
/// fails the test instead of hanging it.
///
/// Signaling is idempotent: firing the signal more than once leaves the
/// gate released. Each gate is meant for a single dispatch/wait pair;
/// create a fresh gate per rendezvous.
///
/// # Example
///
/// ```rust,ignore
/// let gate = CompletionGate::new();
/// gate.dispatch(|signal| {
///     remote.insert(record, Box::new(move |_| signal.complete()));
/// });
/// gate.run_to_completion().unwrap();
/// ```
pub struct CompletionGate {
    inner: Arc<GateInner>,
    timeout: Duration,
}

impl CompletionGate {
    /// Default bound on the wait.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a gate with the default wait bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Creates a gate with a specific wait bound.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(GateInner::default()),
            timeout,
        }
    }

    /// Returns a signal that releases this gate.
    #[must_use]
    pub fn signal(&self) -> CompletionSignal {
        CompletionSignal {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Runs `work` on the calling thread, handing it the gate's signal.
    ///
    /// The work schedules whatever asynchronous activity will eventually
    /// fire the signal.
    pub fn dispatch(&self, work: impl FnOnce(CompletionSignal)) {
        work(self.signal());
    }

    /// Returns true if the signal has fired.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        *self.inner.done.lock()
    }

    /// Blocks the calling thread until the signal fires.
    ///
    /// Fails with [`GateTimedOut`] once the wait bound elapses.
    pub fn run_to_completion(&self) -> Result<(), GateTimedOut> {
        let deadline = Instant::now() + self.timeout;
        let mut done = self.inner.done.lock();
        while !*done {
            let now = Instant::now();
            if now >= deadline {
                return Err(GateTimedOut(self.timeout));
            }
            self.inner.cond.wait_for(&mut done, deadline - now);
        }
        Ok(())
    }
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases a [`CompletionGate`]. Cloneable; firing is idempotent.
#[derive(Clone)]
pub struct CompletionSignal {
    inner: Arc<GateInner>,
}

impl CompletionSignal {
    /// Fires the signal, releasing the gate's waiter.
    pub fn complete(&self) {
        let mut done = self.inner.done.lock();
        *done = true;
        self.inner.cond.notify_all();
    }
}
