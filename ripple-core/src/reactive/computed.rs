//! Computed Implementation
//!
//! A Computed is a cached derived value that re-derives only when read after
//! one of its dependencies changed.
//!
//! # How Computed Values Work
//!
//! 1. Nothing runs on creation. The value starts invalid.
//!
//! 2. On read, an invalid computed drops its old subscriptions, runs its
//!    derive function inside a computed context (re-subscribing to whatever
//!    it reads this time), caches the result and becomes valid.
//!
//! 3. A valid computed returns its cache without calling derive.
//!
//! 4. When a dependency is written, the computed is invalidated at once,
//!    together with every computed that read it. Effects that read the
//!    computed are re-run right away; the value itself is only re-derived
//!    when one of them (or anyone else) reads it.
//!
//! This push-invalidate / pull-recompute split means any number of writes
//! between two reads costs a single derivation.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::context::Reentrancy;
use super::runtime::Runtime;
use super::subscriber::{ComputedRef, EffectRef, Subscriber, SubscriberId};
use crate::error::{ReactiveError, Result};
use crate::graph::{SubjectId, VALUE_KEY};

/// Type-erased view of a computed value, as stored in the graph.
pub(crate) trait ComputedNode: Send + Sync {
    fn id(&self) -> SubscriberId;

    /// Subject under which readers of this computed are subscribed.
    fn subject(&self) -> SubjectId;

    /// Mark the cache stale and hand back the effects linked to it.
    fn invalidate(&self, linked: &mut Vec<EffectRef>);

    /// Forget linked effects.
    fn detach(&self);
}

struct ComputedState<T> {
    value: Option<T>,
    valid: bool,
}

pub(crate) struct ComputedInner<T> {
    id: SubscriberId,
    subject: SubjectId,
    runtime: Runtime,

    derive: Box<dyn Fn() -> T + Send + Sync>,

    state: RwLock<ComputedState<T>>,

    /// Effects that read this computed. Distinct from the computed's own
    /// upstream subscriptions, which live in the graph.
    effects: Mutex<IndexMap<SubscriberId, EffectRef>>,

    /// Threads currently running `derive`.
    deriving: Reentrancy,
    derive_count: AtomicUsize,
}

impl<T: Send + Sync + 'static> ComputedNode for ComputedInner<T> {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn subject(&self) -> SubjectId {
        self.subject
    }

    fn invalidate(&self, linked: &mut Vec<EffectRef>) {
        self.state.write().valid = false;
        let effects = self.effects.lock();
        trace!(computed = %self.id, linked = effects.len(), "invalidate");
        linked.extend(effects.values().cloned());
    }

    fn detach(&self) {
        self.effects.lock().clear();
    }
}

/// A lazily derived, memoized, read-only value.
///
/// Cloning a `Computed` creates a new handle to the same cache.
///
/// # Example
///
/// ```
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.ref_cell(2);
///
/// let c = count.clone();
/// let doubled = rt.computed(move || c.get().as_i64().unwrap_or_default() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// assert!(doubled.set(0).is_err());
/// ```
pub struct Computed<T> {
    inner: Arc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new<F>(runtime: &Runtime, derive: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(ComputedInner {
            id: SubscriberId::new(),
            subject: SubjectId::new(),
            runtime: runtime.clone(),
            derive: Box::new(derive),
            state: RwLock::new(ComputedState {
                value: None,
                valid: false,
            }),
            effects: Mutex::new(IndexMap::new()),
            deriving: Reentrancy::default(),
            derive_count: AtomicUsize::new(0),
        });

        let node: ComputedRef = inner.clone();
        runtime.register_computed(&node);

        Self { inner }
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Read the value, deriving it first if it is stale.
    ///
    /// # Panics
    ///
    /// Panics if the computed reads itself while deriving on the same
    /// thread. Use [`try_get`](Self::try_get) to handle that case.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Read the value, deriving it first if it is stale.
    ///
    /// Returns [`ReactiveError::Cycle`] when called from inside this
    /// computed's own derive on the same thread.
    pub fn try_get(&self) -> Result<T> {
        let inner = &self.inner;
        if inner.deriving.is_entered() {
            return Err(ReactiveError::Cycle);
        }

        let active = inner.runtime.contexts().active();
        if let Some(effect) = active.effect {
            inner.effects.lock().entry(effect.id()).or_insert(effect);
        }
        if let Some(reader) = active.computed {
            inner.runtime.subscribe_computed(inner.subject, VALUE_KEY, reader);
        }

        {
            let state = inner.state.read();
            if state.valid {
                if let Some(value) = &state.value {
                    return Ok(value.clone());
                }
            }
        }

        Ok(self.recompute())
    }

    fn recompute(&self) -> T {
        let inner = &self.inner;
        let _deriving = inner.deriving.enter();

        inner.runtime.clear_computed(inner.id);

        let value = {
            let node: ComputedRef = inner.clone();
            let _ctx = inner.runtime.contexts().enter(Subscriber::Computed(node));
            (inner.derive)()
        };

        let runs = inner.derive_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(computed = %inner.id, runs, "derived");

        let mut state = inner.state.write();
        state.value = Some(value.clone());
        state.valid = true;
        value
    }

    /// Computed values cannot be assigned. Always fails.
    pub fn set(&self, _value: T) -> Result<()> {
        Err(ReactiveError::ReadOnly)
    }

    /// Whether the cached value is current.
    pub fn is_valid(&self) -> bool {
        self.inner.state.read().valid
    }

    /// The last derived value, stale or not, without tracking or deriving.
    pub fn cached(&self) -> Option<T> {
        self.inner.state.read().value.clone()
    }

    /// Number of times derive has run.
    pub fn derive_count(&self) -> usize {
        self.inner.derive_count.load(Ordering::SeqCst)
    }

    /// Effects and computed values currently reading this computed.
    pub fn dependent_count(&self) -> usize {
        self.inner.effects.lock().len()
            + self
                .inner
                .runtime
                .subscriber_count(self.inner.subject, VALUE_KEY)
    }
}

impl<T> fmt::Debug for Computed<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("valid", &state.valid)
            .field("cached", &state.value)
            .finish()
    }
}
