//! Values that may or may not be reactive.
//!
//! Component-style code often accepts either a plain value or something that
//! produces one. [`MaybeReactive`] covers both and resolves to the current
//! value with a tracked read when there is something to track.

use std::fmt;
use std::sync::Arc;

use super::cell::Ref;
use super::computed::Computed;
use crate::value::Value;

type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// A plain value, a cell, a computed value or a getter function.
#[derive(Clone)]
pub enum MaybeReactive {
    Static(Value),
    Ref(Ref),
    Computed(Computed<Value>),
    Getter(Getter),
}

impl MaybeReactive {
    pub fn getter<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        MaybeReactive::Getter(Arc::new(f))
    }

    /// Current value. Reads through a cell or computed are tracked, and a
    /// getter is simply called. Records come back raw.
    pub fn resolve(&self) -> Value {
        match self {
            MaybeReactive::Static(value) => value.clone(),
            MaybeReactive::Ref(cell) => cell.get().into_value(),
            MaybeReactive::Computed(computed) => computed.get(),
            MaybeReactive::Getter(f) => f(),
        }
    }

    pub fn is_reactive(&self) -> bool {
        !matches!(self, MaybeReactive::Static(_))
    }
}

impl Default for MaybeReactive {
    fn default() -> Self {
        MaybeReactive::Static(Value::Null)
    }
}

impl fmt::Debug for MaybeReactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaybeReactive::Static(value) => f.debug_tuple("Static").field(value).finish(),
            MaybeReactive::Ref(cell) => f.debug_tuple("Ref").field(cell).finish(),
            MaybeReactive::Computed(computed) => f.debug_tuple("Computed").field(computed).finish(),
            MaybeReactive::Getter(_) => f.write_str("Getter(..)"),
        }
    }
}

impl From<Value> for MaybeReactive {
    fn from(value: Value) -> Self {
        MaybeReactive::Static(value)
    }
}

impl From<&str> for MaybeReactive {
    fn from(value: &str) -> Self {
        MaybeReactive::Static(value.into())
    }
}

impl From<i64> for MaybeReactive {
    fn from(value: i64) -> Self {
        MaybeReactive::Static(value.into())
    }
}

impl From<bool> for MaybeReactive {
    fn from(value: bool) -> Self {
        MaybeReactive::Static(value.into())
    }
}

impl From<Ref> for MaybeReactive {
    fn from(cell: Ref) -> Self {
        MaybeReactive::Ref(cell)
    }
}

impl From<Computed<Value>> for MaybeReactive {
    fn from(computed: Computed<Value>) -> Self {
        MaybeReactive::Computed(computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;
    use crate::record;

    #[test]
    fn static_value_resolves_to_itself() {
        let value = MaybeReactive::from("hello");
        assert!(!value.is_reactive());
        assert_eq!(value.resolve(), Value::from("hello"));
        assert_eq!(MaybeReactive::default().resolve(), Value::Null);
    }

    #[test]
    fn ref_and_computed_resolve_to_current_value() {
        let rt = Runtime::new();
        let cell = rt.ref_cell(1);
        let c = cell.clone();
        let doubled = rt.computed(move || Value::from(c.get().as_i64().unwrap_or_default() * 2));

        let from_ref = MaybeReactive::from(cell.clone());
        let from_computed = MaybeReactive::from(doubled);
        assert!(from_ref.is_reactive());

        cell.set(4);
        assert_eq!(from_ref.resolve(), Value::Int(4));
        assert_eq!(from_computed.resolve(), Value::Int(8));
    }

    #[test]
    fn getter_is_called_each_time() {
        let rt = Runtime::new();
        let state = rt.reactive(record! { "n" => 1 });
        let s = state.clone();
        let value = MaybeReactive::getter(move || s.get("n").into_value());

        assert_eq!(value.resolve(), Value::Int(1));
        state.set("n", 2);
        assert_eq!(value.resolve(), Value::Int(2));
    }

    #[test]
    fn resolving_inside_an_effect_tracks() {
        let rt = Runtime::new();
        let cell = rt.ref_cell("a");
        let value = MaybeReactive::from(cell.clone());

        let effect = rt.effect(move || {
            value.resolve();
        });

        cell.set("b");
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn structured_ref_resolves_to_raw_record() {
        let rt = Runtime::new();
        let inner = record! { "a" => 1 };
        let value = MaybeReactive::from(rt.ref_cell(inner.clone()));
        assert_eq!(value.resolve(), Value::Record(inner));
    }
}
