//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever one of
//! its dependencies is written.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately inside an
//!    effect context. Every tracked read during that run subscribes it.
//!
//! 2. When any of those dependencies is written, the runtime re-runs the
//!    function synchronously, before the write returns.
//!
//! 3. Re-runs happen under an untracked barrier. The dependency set captured
//!    by the first run is never revised, so an effect whose reads depend on
//!    a branch keeps the subscriptions of the branch it took first.
//!
//! # Differences from Computed
//!
//! - Computed values return a value; effects do not.
//! - Computed values are lazy (derive on read); effects are eager.
//! - Computed values re-track their dependencies on every derivation;
//!   effects track once.
//!
//! # Cycles
//!
//! An effect whose body writes to something it depends on would re-trigger
//! itself while still running. The runtime's [`CyclePolicy`] decides whether
//! that nested run is skipped or treated as a bug. Only re-entry on the same
//! thread counts: a write from another thread re-runs the effect normally,
//! even while a run for an earlier write is still in progress.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::context::Reentrancy;
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config::CyclePolicy;

pub(crate) struct EffectInner {
    id: SubscriberId,

    /// The effect function.
    run: Box<dyn Fn() + Send + Sync>,

    /// Number of times the effect has run, including the first run.
    run_count: AtomicUsize,

    /// Threads on which the function is currently on the call stack.
    running: Reentrancy,
}

impl EffectInner {
    pub(crate) fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            run: Box::new(run),
            run_count: AtomicUsize::new(0),
            running: Reentrancy::default(),
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    fn execute(&self) {
        let _running = self.running.enter();

        self.run_count.fetch_add(1, Ordering::SeqCst);
        (self.run)();
    }

    /// Re-run in response to a write. Reads do not subscribe.
    pub(crate) fn rerun(&self, runtime: &Runtime) {
        if self.running.is_entered() {
            match runtime.config().cycle_policy {
                CyclePolicy::Skip => {
                    warn!(effect = %self.id, "effect re-triggered itself while running; skipping");
                    return;
                }
                CyclePolicy::Panic => {
                    panic!("{} re-triggered itself while running", self.id);
                }
            }
        }

        let _barrier = runtime.contexts().enter_untracked();
        self.execute();
    }
}

/// Handle to a registered effect.
///
/// There is no way to unregister an effect: it stays subscribed for as long
/// as its runtime lives. Dropping the handle does not stop it.
///
/// # Example
///
/// ```
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.ref_cell(0);
///
/// let c = count.clone();
/// let effect = rt.effect(move || {
///     println!("count is {:?}", c.get());
/// });
///
/// count.set(5); // prints "count is 5"
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Register `run` and execute it once to capture its dependencies.
    pub(crate) fn new<F>(runtime: &Runtime, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner::new(run));
        debug!(effect = %inner.id, runtime = runtime.label(), "registering effect");

        {
            let _ctx = runtime
                .contexts()
                .enter(Subscriber::Effect(Arc::clone(&inner)));
            inner.execute();
        }

        Self { inner }
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Number of times the effect has run, including registration.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .finish()
    }
}
