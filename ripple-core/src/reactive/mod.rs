//! Reactive Primitives
//!
//! This module implements the core reactive system: reactive records, ref
//! cells, computed values and effects.
//!
//! # Concepts
//!
//! ## Reactive
//!
//! A [`Reactive`] wraps a record. Reading a field within a tracking context
//! (a computed derivation or an effect's first run) registers that context
//! as a dependent of the field. Writing a different value to the field
//! notifies every dependent. Nested records are wrapped on read.
//!
//! ## Ref
//!
//! A [`Ref`] is a single reactive slot with the same read/write contract.
//!
//! ## Computed
//!
//! A [`Computed`] is a derived value that caches its result. It is
//! invalidated eagerly when a dependency changes and re-derived lazily on
//! the next read, re-collecting its dependencies each time.
//!
//! ## Effects
//!
//! An [`Effect`] runs once on creation and again, synchronously, whenever a
//! dependency collected during that first run is written.
//!
//! # Implementation Notes
//!
//! Every primitive belongs to a [`Runtime`]. The free functions in this
//! module use the calling thread's default runtime, which is what most
//! applications need; tests and embedders that want isolation create their
//! own.

mod cell;
mod computed;
mod context;
mod effect;
mod maybe;
mod runtime;
mod subscriber;
mod wrapper;

pub use cell::Ref;
pub use computed::Computed;
pub use effect::Effect;
pub use maybe::MaybeReactive;
pub use runtime::Runtime;
pub use subscriber::SubscriberId;
pub use wrapper::{Field, Reactive};

use crate::value::{Record, Value};

/// Wrap a record on the current thread's runtime.
pub fn reactive(record: Record) -> Reactive {
    Runtime::current().reactive(record)
}

/// Create a ref cell on the current thread's runtime.
pub fn ref_cell(initial: impl Into<Value>) -> Ref {
    Runtime::current().ref_cell(initial)
}

/// Create a computed value on the current thread's runtime.
pub fn computed<T, F>(derive: F) -> Computed<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Runtime::current().computed(derive)
}

/// Register an effect on the current thread's runtime and run it once.
pub fn effect<F>(run: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Runtime::current().effect(run)
}

/// Run `f` with tracking disabled on the current thread's runtime.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    Runtime::current().untracked(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn free_functions_share_the_thread_runtime() {
        let state = reactive(record! { "n" => 1 });
        assert!(state.runtime().ptr_eq(&Runtime::current()));

        let s = state.clone();
        let doubled = computed(move || s.get("n").as_i64().unwrap_or_default() * 2);

        let d = doubled.clone();
        let seen = ref_cell(0);
        let out = seen.clone();
        effect(move || {
            out.set(d.get());
        });

        state.set("n", 5);
        assert_eq!(seen.get().as_i64(), Some(10));
        assert_eq!(untracked(|| doubled.get()), 10);
    }
}
