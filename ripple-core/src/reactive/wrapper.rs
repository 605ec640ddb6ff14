//! Composite Wrapper
//!
//! A [`Reactive`] is the tracking handle over a [`Record`]. Every `get`
//! records a dependency on `(record, key)`; every `set` that changes the
//! stored value notifies the subscribers of that key.
//!
//! Nested records are wrapped lazily: a record-valued field is handed out as
//! another `Reactive` only when it is read, so the cost of deep reactivity is
//! bounded by what is actually accessed.

use std::fmt;
use std::sync::Arc;

use super::runtime::Runtime;
use crate::graph::SubjectId;
use crate::value::{Record, Value};

/// Wrapper state, owned by the runtime's wrapper cache.
pub(crate) struct WrapperInner {
    record: Record,
}

impl WrapperInner {
    pub(crate) fn new(record: Record) -> Arc<Self> {
        Arc::new(Self { record })
    }
}

/// Tracking handle over a record.
///
/// Obtained from [`Runtime::reactive`]. Two handles are equal only if they
/// are the same wrapper, which is the case for any two wraps of the same
/// record in the same runtime.
#[derive(Clone)]
pub struct Reactive {
    runtime: Runtime,
    inner: Arc<WrapperInner>,
}

impl Reactive {
    pub(crate) fn new(runtime: Runtime, inner: Arc<WrapperInner>) -> Self {
        Self { runtime, inner }
    }

    /// Subject ID of the wrapped record.
    pub fn id(&self) -> SubjectId {
        self.inner.record.id()
    }

    /// The wrapped record. Access through it is not tracked.
    pub fn record(&self) -> &Record {
        &self.inner.record
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Tracked read. Missing fields read as null.
    pub fn get(&self, key: &str) -> Field {
        self.runtime.track(self.id(), key);
        self.get_untracked(key)
    }

    /// Read without registering a dependency.
    pub fn get_untracked(&self, key: &str) -> Field {
        let raw = self.inner.record.get(key).unwrap_or_default();
        self.runtime.field(raw)
    }

    /// Store `value` under `key` and notify subscribers if it changed.
    ///
    /// A `Reactive` passed as the value is stored as its underlying record.
    /// Returns whether the stored value changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        if self.inner.record.get(key).as_ref() == Some(&value) {
            return false;
        }

        self.inner.record.insert(key, value);
        self.runtime.trigger(self.id(), key);
        true
    }

    /// Replace the value under `key` with `f(current)`.
    pub fn update(&self, key: &str, f: impl FnOnce(&Value) -> Value) -> bool {
        let next = f(&self.inner.record.get(key).unwrap_or_default());
        self.set(key, next)
    }

    /// Field names, in insertion order. Not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.inner.record.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.record.is_empty()
    }

    /// Current contents as JSON. Not tracked.
    pub fn to_json(&self) -> serde_json::Value {
        Value::Record(self.inner.record.clone()).to_json()
    }

    /// Number of effects and computed values subscribed to `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.runtime.subscriber_count(self.id(), key)
    }

    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) && self.runtime.ptr_eq(&other.runtime)
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Reactive {}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("subject", &self.id())
            .field("keys", &self.keys())
            .finish()
    }
}

impl From<Reactive> for Value {
    fn from(reactive: Reactive) -> Self {
        Value::Record(reactive.inner.record.clone())
    }
}

impl From<&Reactive> for Value {
    fn from(reactive: &Reactive) -> Self {
        Value::Record(reactive.inner.record.clone())
    }
}

/// The result of a tracked read.
///
/// Records come back wrapped, everything else as a plain [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    Reactive(Reactive),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Reactive(_) => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Field::Reactive(reactive) => Some(reactive),
            Field::Value(_) => None,
        }
    }

    pub fn into_reactive(self) -> Option<Reactive> {
        match self {
            Field::Reactive(reactive) => Some(reactive),
            Field::Value(_) => None,
        }
    }

    /// The raw value. A wrapped record is returned as its record.
    pub fn into_value(self) -> Value {
        match self {
            Field::Value(value) => value,
            Field::Reactive(reactive) => reactive.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Value(Value::Null))
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }
}

impl From<Field> for Value {
    fn from(field: Field) -> Self {
        field.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn reads_and_writes_like_a_plain_record() {
        let rt = Runtime::new();
        let obj = rt.reactive(record! { "value" => 1 });

        assert_eq!(obj.get("value").as_i64(), Some(1));
        assert!(obj.set("value", 10));
        assert_eq!(obj.get("value").as_i64(), Some(10));
        assert_eq!(obj.record().get("value"), Some(Value::Int(10)));
        assert!(obj.get("missing").is_null());
    }

    #[test]
    fn nested_records_are_wrapped_on_read() {
        let rt = Runtime::new();
        let nested = record! { "value" => 1 };
        let obj = rt.reactive(record! { "nested" => nested.clone() });

        let inner = obj.get("nested").into_reactive();
        assert_eq!(inner.as_ref().map(Reactive::record), Some(&nested));
        assert_eq!(inner, Some(rt.reactive(nested)));
    }

    #[test]
    fn equal_write_is_silent() {
        let rt = Runtime::new();
        let obj = rt.reactive(record! { "x" => 1 });
        let runs = Arc::new(AtomicI32::new(0));

        let (o, r) = (obj.clone(), runs.clone());
        rt.effect(move || {
            o.get("x");
            r.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!obj.set("x", 1));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reads_do_not_trigger() {
        let rt = Runtime::new();
        let obj = rt.reactive(record! { "x" => 1 });
        let runs = Arc::new(AtomicI32::new(0));

        let (o, r) = (obj.clone(), runs.clone());
        rt.effect(move || {
            o.get("x");
            r.fetch_add(1, Ordering::SeqCst);
        });

        obj.get("x");
        obj.get("x");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn storing_a_wrapper_stores_its_record() {
        let rt = Runtime::new();
        let child = rt.reactive(record! { "n" => 1 });
        let parent = rt.reactive(record! {});

        parent.set("child", &child);
        assert_eq!(
            parent.record().get("child"),
            Some(Value::Record(child.record().clone()))
        );
        assert_eq!(parent.get("child").into_reactive(), Some(child.clone()));

        // Same record again: no change.
        assert!(!parent.set("child", child));
    }

    #[test]
    fn update_applies_function() {
        let rt = Runtime::new();
        let obj = rt.reactive(record! { "n" => 1 });
        obj.update("n", |v| Value::from(v.as_i64().unwrap_or_default() + 1));
        assert_eq!(obj.get("n").as_i64(), Some(2));
    }

    #[test]
    fn to_json_reflects_writes() {
        let rt = Runtime::new();
        let obj = rt.reactive(record! { "a" => 1 });
        obj.set("b", "two");
        assert_eq!(obj.to_json(), serde_json::json!({ "a": 1, "b": "two" }));
    }
}
