//! Ref Cell Implementation
//!
//! A [`Ref`] is a single-slot reactive container. It follows the same
//! contract as a field of a [`Reactive`]: a tracked `get`, and a `set` that
//! notifies only when the stored value changes.
//!
//! # Representation
//!
//! - A scalar initial value lives in a standalone slot, tracked under the
//!   slot's own subject ID and the `"value"` key. No wrapper is allocated.
//! - A record initial value is held in a one-field holder record
//!   `{ "value": record }` behind a regular wrapper, so nested reactivity
//!   works exactly as it does for [`Reactive`] fields.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::Runtime;
use super::wrapper::{Field, Reactive};
use crate::graph::{SubjectId, VALUE_KEY};
use crate::value::{Record, Value};

struct Slot {
    id: SubjectId,
    value: RwLock<Value>,
}

#[derive(Clone)]
enum Repr {
    Slot(Arc<Slot>),
    Holder(Reactive),
}

/// A single-slot reactive cell.
///
/// Cloning a `Ref` yields another handle to the same slot.
///
/// # Example
///
/// ```
/// use ripple_core::Runtime;
///
/// let rt = Runtime::new();
/// let count = rt.ref_cell(0);
///
/// count.set(5);
/// assert_eq!(count.get().as_i64(), Some(5));
///
/// count.update(|v| (v.as_i64().unwrap_or_default() + 1).into());
/// assert_eq!(count.get().as_i64(), Some(6));
/// ```
#[derive(Clone)]
pub struct Ref {
    runtime: Runtime,
    repr: Repr,
}

impl Ref {
    pub(crate) fn new(runtime: &Runtime, initial: Value) -> Self {
        let repr = match initial {
            Value::Record(record) => {
                let holder = Record::new().with(VALUE_KEY, record);
                Repr::Holder(runtime.reactive(holder))
            }
            scalar => Repr::Slot(Arc::new(Slot {
                id: SubjectId::new(),
                value: RwLock::new(scalar),
            })),
        };

        Self {
            runtime: runtime.clone(),
            repr,
        }
    }

    /// Subject ID the cell is tracked under.
    pub fn id(&self) -> SubjectId {
        match &self.repr {
            Repr::Slot(slot) => slot.id,
            Repr::Holder(holder) => holder.id(),
        }
    }

    /// Whether the cell was created with a record and delegates to a wrapper.
    pub fn is_structured(&self) -> bool {
        matches!(self.repr, Repr::Holder(_))
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> Field {
        match &self.repr {
            Repr::Slot(slot) => {
                self.runtime.track(slot.id, VALUE_KEY);
                self.get_untracked()
            }
            Repr::Holder(holder) => holder.get(VALUE_KEY),
        }
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> Field {
        match &self.repr {
            Repr::Slot(slot) => {
                let raw = slot.value.read().clone();
                self.runtime.field(raw)
            }
            Repr::Holder(holder) => holder.get_untracked(VALUE_KEY),
        }
    }

    /// Set a new value and notify subscribers if it changed.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        match &self.repr {
            Repr::Slot(slot) => {
                {
                    let mut current = slot.value.write();
                    if *current == value {
                        return false;
                    }
                    *current = value;
                }
                self.runtime.trigger(slot.id, VALUE_KEY);
                true
            }
            Repr::Holder(holder) => holder.set(VALUE_KEY, value),
        }
    }

    /// Update the value using a function of the current raw value.
    pub fn update(&self, f: impl FnOnce(&Value) -> Value) -> bool {
        let next = match &self.repr {
            Repr::Slot(slot) => f(&slot.value.read()),
            Repr::Holder(holder) => f(&holder.record().get(VALUE_KEY).unwrap_or_default()),
        };
        self.set(next)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.runtime.subscriber_count(self.id(), VALUE_KEY)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.id())
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
