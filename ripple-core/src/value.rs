//! Value Model
//!
//! Reactive state is held as dynamic slot maps rather than arbitrary Rust
//! structs, so every field access can be routed through a tracking handle.
//!
//! - [`Value`] is a scalar or a [`Record`].
//! - [`Record`] is a shared, mutable map from field names to values. It has
//!   reference identity: cloning a `Record` yields another handle to the same
//!   fields, and two records are equal only if they are the same record.
//!
//! Records are the structured subjects of the runtime. Reading a record-valued
//! field through a reactive handle wraps it on demand, so nested state becomes
//! reactive only as deep as it is actually read.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::graph::SubjectId;

/// A dynamic value stored in a reactive slot.
#[derive(Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A structured subject. Compared by identity.
    Record(Record),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is a structured subject.
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Convert to JSON. Records are expanded recursively.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Record(r) => serde_json::Value::Object(
                r.entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Record(r) => write!(f, "{r:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// JSON objects become fresh records. Arrays become records keyed by index
/// (`"0"`, `"1"`, ...), which keeps every element individually trackable.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::Record(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), Value::from(v)))
                    .collect(),
            ),
            serde_json::Value::Object(fields) => Value::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Record(r) => r.serialize(serializer),
        }
    }
}

struct RecordInner {
    id: SubjectId,
    fields: RwLock<IndexMap<String, Value>>,
}

/// A structured subject: a shared map of named fields.
///
/// Mutating a `Record` directly bypasses tracking. Go through
/// [`Runtime::reactive`](crate::Runtime::reactive) to get a handle whose
/// writes notify subscribers.
///
/// Records may reference each other freely, but a record that contains
/// itself (directly or transitively) cannot be serialized or converted to
/// JSON.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RecordInner {
                id: SubjectId::new(),
                fields: RwLock::new(IndexMap::new()),
            }),
        }
    }

    /// Builder-style field insertion.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.fields.write().insert(key.into(), value.into());
        self
    }

    /// The subject ID this record is tracked under.
    pub fn id(&self) -> SubjectId {
        self.inner.id
    }

    /// Read a field without tracking.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.fields.read().get(key).cloned()
    }

    /// Store a field without notifying anyone. Returns the previous value.
    pub(crate) fn insert(&self, key: &str, value: Value) -> Option<Value> {
        let mut fields = self.inner.fields.write();
        match fields.get_mut(key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                fields.insert(key.to_owned(), value);
                None
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.fields.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.fields.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.fields.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current fields, in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .fields
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether both handles refer to the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Record {}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.inner.fields.read();
        f.debug_struct("Record")
            .field("id", &self.inner.id.raw())
            .field("fields", &fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let record = Record::new();
        {
            let mut fields = record.inner.fields.write();
            for (k, v) in iter {
                fields.insert(k.into(), v.into());
            }
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (k, v) in &entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Build a [`Record`] from `key => value` pairs.
///
/// ```
/// use ripple_core::record;
///
/// let user = record! {
///     "name" => "ada",
///     "address" => record! { "city" => "London" },
/// };
/// assert_eq!(user.len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with($key, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_compare_by_identity() {
        let a = Record::new().with("x", 1);
        let b = Record::new().with("x", 1);

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(Value::from(a.clone()), Value::from(b));
        assert_eq!(Value::from(a.clone()), Value::from(a));
    }

    #[test]
    fn scalars_compare_by_value() {
        assert_eq!(Value::from(1), Value::Int(1));
        assert_eq!(Value::from("hi"), Value::Str("hi".into()));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn insert_returns_previous_value() {
        let record = Record::new();
        assert_eq!(record.insert("x", Value::Int(1)), None);
        assert_eq!(record.insert("x", Value::Int(2)), Some(Value::Int(1)));
        assert_eq!(record.get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn json_objects_become_nested_records() {
        let json = serde_json::json!({
            "name": "ada",
            "tags": ["a", "b"],
            "nested": { "value": 1, "ratio": 0.5 }
        });

        let value = Value::from(json.clone());
        let record = value.as_record().cloned().unwrap_or_default();

        assert_eq!(record.len(), 3);
        assert_eq!(record.get("name"), Some(Value::from("ada")));
        let tags = record.get("tags").unwrap_or_default();
        assert_eq!(tags.as_record().map(Record::len), Some(2));

        let nested = record.get("nested").unwrap_or_default();
        let nested = nested.as_record().cloned().unwrap_or_default();
        assert_eq!(nested.get("value"), Some(Value::Int(1)));
        assert_eq!(nested.get("ratio"), Some(Value::Float(0.5)));
    }

    #[test]
    fn serializes_records_as_maps() {
        let value = Value::from(record! {
            "a" => 1,
            "b" => record! { "c" => true },
            "d" => Value::Null,
        });

        let json = serde_json::to_value(&value).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({ "a": 1, "b": { "c": true }, "d": null })
        );
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn record_macro_builds_in_order() {
        let empty = record! {};
        assert!(empty.is_empty());

        let r = record! { "z" => 1, "a" => 2 };
        assert_eq!(r.keys(), vec!["z", "a"]);
    }
}
