//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects reactive subjects,
//! computed values and effects. It owns the dependency graph, the context
//! stacks and the wrapper identity cache.
//!
//! # How It Works
//!
//! 1. When an effect or computed value reads a subject, the runtime records
//!    the dependency under `(subject, key)`.
//!
//! 2. When a value is written, the runtime:
//!    a. Finds the computed values subscribed to the key and invalidates
//!       them, transitively through computed values that read them
//!    b. Collects the effects linked to every invalidated computed
//!    c. Runs those effects, then the effects subscribed directly to the
//!       key, each at most once
//!    d. Computed values stay lazy: they re-derive on next read
//!
//! All of this happens before the write returns. There is no batching.
//!
//! # Threads
//!
//! Context stacks are kept per thread, and internal tables are behind locks
//! that are never held while user code runs. A write and its whole cascade
//! run on the writing thread.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::cell::Ref;
use super::computed::{Computed, ComputedNode};
use super::context::Contexts;
use super::effect::Effect;
use super::subscriber::{ComputedRef, EffectRef, Notified, SubscriberId};
use super::wrapper::{Field, Reactive, WrapperInner};
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, Result};
use crate::graph::{DependencyGraph, SubjectId, VALUE_KEY};
use crate::value::{Record, Value};

struct RuntimeInner {
    config: RuntimeConfig,

    graph: Mutex<DependencyGraph<EffectRef, ComputedRef>>,

    contexts: Contexts,

    /// Wrapper identity cache. Entries live as long as the runtime, or until
    /// `dispose`. They hold only the record, never the runtime.
    wrappers: Mutex<HashMap<SubjectId, Arc<WrapperInner>>>,

    /// Every computed created on this runtime, for `dispose`.
    computeds: Mutex<Vec<Weak<dyn ComputedNode>>>,
}

/// A reactive runtime.
///
/// Every primitive belongs to exactly one runtime, and runtimes share no
/// state. Cloning a `Runtime` yields another handle to the same runtime.
///
/// ```
/// use ripple_core::{record, Runtime};
///
/// let rt = Runtime::new();
/// let state = rt.reactive(record! { "count" => 1 });
///
/// let s = state.clone();
/// let doubled = rt.computed(move || s.get("count").as_i64().unwrap_or_default() * 2);
///
/// state.set("count", 21);
/// assert_eq!(doubled.get(), 42);
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

thread_local! {
    static CURRENT: Runtime = Runtime::new();
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let runtime = Self {
            inner: Arc::new(RuntimeInner {
                config,
                graph: Mutex::new(DependencyGraph::new()),
                contexts: Contexts::default(),
                wrappers: Mutex::new(HashMap::new()),
                computeds: Mutex::new(Vec::new()),
            }),
        };
        debug!(runtime = runtime.label(), "created reactive runtime");
        runtime
    }

    /// The calling thread's default runtime, used by the free functions.
    pub fn current() -> Self {
        CURRENT.with(Runtime::clone)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn label(&self) -> &str {
        self.inner.config.label.as_deref().unwrap_or("ripple")
    }

    /// Wrap a record in a tracking handle.
    ///
    /// Wrapping the same record again looks up the existing wrapper instead
    /// of creating a new one, so the handles compare equal.
    pub fn reactive(&self, record: Record) -> Reactive {
        let inner = Arc::clone(
            self.inner
                .wrappers
                .lock()
                .entry(record.id())
                .or_insert_with(|| WrapperInner::new(record)),
        );
        Reactive::new(self.clone(), inner)
    }

    /// Like [`reactive`](Self::reactive), for a dynamic value.
    ///
    /// Fails for anything that is not a record.
    pub fn try_reactive(&self, value: impl Into<Value>) -> Result<Reactive> {
        match value.into() {
            Value::Record(record) => Ok(self.reactive(record)),
            other => Err(ReactiveError::NotStructured { found: other.kind() }),
        }
    }

    /// Create a single-slot reactive cell.
    pub fn ref_cell(&self, initial: impl Into<Value>) -> Ref {
        Ref::new(self, initial.into())
    }

    /// Create a lazily derived value.
    pub fn computed<T, F>(&self, derive: F) -> Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Computed::new(self, derive)
    }

    /// Register an effect and run it once.
    pub fn effect<F>(&self, run: F) -> Effect
    where
        F: Fn() + Send + Sync + 'static,
    {
        Effect::new(self, run)
    }

    /// Run `f` with tracking disabled. Reads inside subscribe nothing.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _barrier = self.inner.contexts.enter_untracked();
        f()
    }

    /// Whether a read on this thread would currently subscribe anything.
    pub fn is_tracking(&self) -> bool {
        self.inner.contexts.is_tracking()
    }

    /// Tear the runtime down: drop every subscription, the wrapper cache and
    /// the links between computed values and effects.
    ///
    /// Handles stay usable afterwards, but nothing they did before is
    /// remembered. This also breaks the reference cycles that effects and
    /// computed values form through their closures.
    pub fn dispose(&self) {
        let computeds = std::mem::take(&mut *self.inner.computeds.lock());
        for computed in computeds.iter().filter_map(Weak::upgrade) {
            computed.detach();
        }
        self.inner.graph.lock().clear();
        self.inner.wrappers.lock().clear();
        self.inner.contexts.clear();
        debug!(runtime = self.label(), "disposed reactive runtime");
    }

    /// Whether both handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn contexts(&self) -> &Contexts {
        &self.inner.contexts
    }

    /// Wrap a raw value for handing to a reader.
    pub(crate) fn field(&self, value: Value) -> Field {
        match value {
            Value::Record(record) => Field::Reactive(self.reactive(record)),
            other => Field::Value(other),
        }
    }

    /// Record a read of `subject.key` against the active subscribers.
    pub(crate) fn track(&self, subject: SubjectId, key: &str) {
        let active = self.inner.contexts.active();
        if active.is_empty() {
            return;
        }

        trace!(%subject, key, "track");
        let mut graph = self.inner.graph.lock();
        if let Some(effect) = active.effect {
            graph.add_effect(subject, key, effect.id(), effect);
        }
        if let Some(computed) = active.computed {
            graph.add_computed(subject, key, computed.id(), computed);
        }
    }

    pub(crate) fn subscribe_computed(&self, subject: SubjectId, key: &str, computed: ComputedRef) {
        self.inner
            .graph
            .lock()
            .add_computed(subject, key, computed.id(), computed);
    }

    pub(crate) fn clear_computed(&self, id: SubscriberId) {
        self.inner.graph.lock().clear_computed(id);
    }

    pub(crate) fn register_computed(&self, computed: &ComputedRef) {
        let mut computeds = self.inner.computeds.lock();
        computeds.retain(|c| c.strong_count() > 0);
        computeds.push(Arc::downgrade(computed));
    }

    pub(crate) fn subscriber_count(&self, subject: SubjectId, key: &str) -> usize {
        self.inner.graph.lock().subscriber_count(subject, key)
    }

    /// Notify everything that depends on `subject.key`.
    pub(crate) fn trigger(&self, subject: SubjectId, key: &str) {
        let found = self.inner.graph.lock().subscribers(subject, key);
        if found.is_empty() {
            return;
        }
        trace!(
            %subject,
            key,
            computeds = found.computeds.len(),
            effects = found.effects.len(),
            "trigger"
        );

        let mut notified = Notified::default();

        // Invalidate every computed downstream of the key before any effect
        // runs, so no effect can observe a stale cache.
        let mut linked = Vec::new();
        let mut queue: VecDeque<ComputedRef> = found.computeds.into_iter().collect();
        while let Some(computed) = queue.pop_front() {
            if !notified.insert(computed.id()) {
                continue;
            }
            computed.invalidate(&mut linked);
            let downstream = self
                .inner
                .graph
                .lock()
                .subscribers(computed.subject(), VALUE_KEY);
            queue.extend(downstream.computeds);
        }

        for effect in linked.into_iter().chain(found.effects) {
            if notified.insert(effect.id()) {
                effect.rerun(self);
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("label", &self.label())
            .field("wrappers", &self.inner.wrappers.lock().len())
            .field("computeds", &self.inner.computeds.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counter() -> Arc<AtomicI32> {
        Arc::new(AtomicI32::new(0))
    }

    #[test]
    fn runtime_notifies_both_kinds() {
        let rt = Runtime::new();
        let state = rt.reactive(record! { "x" => 1 });

        let s = state.clone();
        let computed = rt.computed(move || s.get("x").as_i64());
        assert_eq!(computed.get(), Some(1));

        let runs = counter();
        let runs_clone = runs.clone();
        let s = state.clone();
        rt.effect(move || {
            s.get("x");
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(state.subscriber_count("x"), 2);

        state.set("x", 2);
        assert!(!computed.is_valid());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn recompute_clears_stale_dependencies() {
        let rt = Runtime::new();
        let state = rt.reactive(record! { "flag" => true, "a" => 1, "b" => 2 });

        let s = state.clone();
        let computed = rt.computed(move || {
            let key = if s.get("flag").as_bool() == Some(true) { "a" } else { "b" };
            s.get(key).as_i64()
        });

        assert_eq!(computed.get(), Some(1));
        assert_eq!(state.subscriber_count("a"), 1);
        assert_eq!(state.subscriber_count("b"), 0);

        state.set("flag", false);
        assert_eq!(computed.get(), Some(2));
        assert_eq!(state.subscriber_count("a"), 0);
        assert_eq!(state.subscriber_count("b"), 1);
    }

    #[test]
    fn untracked_reads_subscribe_nothing() {
        let rt = Runtime::new();
        let cell = rt.ref_cell(1);

        let (rt2, c) = (rt.clone(), cell.clone());
        let effect = rt.effect(move || {
            assert!(rt2.is_tracking());
            rt2.untracked(|| c.get());
        });

        cell.set(2);
        assert_eq!(effect.run_count(), 1);
        assert!(!rt.is_tracking());
    }

    #[test]
    fn try_reactive_rejects_scalars() {
        let rt = Runtime::new();
        assert_eq!(
            rt.try_reactive(3).err(),
            Some(ReactiveError::NotStructured { found: "int" })
        );
        assert!(rt.try_reactive(record! { "a" => 1 }).is_ok());
    }

    #[test]
    fn wrapper_outlives_its_handles() {
        let rt = Runtime::new();
        let record = record! { "a" => 1 };

        let first = rt.reactive(record.clone());
        assert_eq!(rt.reactive(record.clone()), first);
        drop(first);

        let cached = rt.inner.wrappers.lock().get(&record.id()).cloned();
        assert!(cached.is_some());

        // Re-wrapping reuses the cached state instead of allocating.
        let again = rt.reactive(record.clone());
        assert!(cached.is_some_and(|c| Arc::strong_count(&c) == 3));
        assert_eq!(rt.inner.wrappers.lock().len(), 1);
        assert_eq!(again.get("a").as_i64(), Some(1));

        rt.dispose();
        assert!(rt.inner.wrappers.lock().is_empty());
    }

    #[test]
    fn dispose_forgets_subscriptions() {
        let rt = Runtime::new();
        let cell = rt.ref_cell(0);

        let c = cell.clone();
        let effect = rt.effect(move || {
            c.get();
        });
        assert_eq!(cell.subscriber_count(), 1);

        rt.dispose();
        assert_eq!(cell.subscriber_count(), 0);

        cell.set(1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn runtimes_are_isolated() {
        let rt1 = Runtime::new();
        let rt2 = Runtime::new();
        let record = record! { "x" => 1 };

        let a = rt1.reactive(record.clone());
        let b = rt2.reactive(record);
        assert_ne!(a, b);

        let runs = counter();
        let runs_clone = runs.clone();
        let a2 = a.clone();
        rt1.effect(move || {
            a2.get("x");
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Same record, but the write goes through the other runtime.
        b.set("x", 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        a.set("x", 3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn current_is_stable_per_thread() {
        assert!(Runtime::current().ptr_eq(&Runtime::current()));
    }
}
