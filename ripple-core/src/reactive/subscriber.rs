//! Subscriber types for the reactive system.
//!
//! A subscriber is a computation that depends on reactive values: either an
//! effect (re-runs eagerly) or a computed value (invalidates lazily).

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::computed::ComputedNode;
use super::effect::EffectInner;

/// Unique identifier for a subscriber.
///
/// Effects and computed values draw from the same counter, so an ID is
/// unique across both kinds. This is what lets a single notified-set
/// deduplicate a whole write cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber#{}", self.0)
    }
}

pub(crate) type EffectRef = Arc<EffectInner>;
pub(crate) type ComputedRef = Arc<dyn ComputedNode>;

/// A subscriber of either kind.
#[derive(Clone)]
pub(crate) enum Subscriber {
    Effect(EffectRef),
    Computed(ComputedRef),
}

impl Subscriber {
    pub(crate) fn id(&self) -> SubscriberId {
        match self {
            Subscriber::Effect(effect) => effect.id(),
            Subscriber::Computed(computed) => computed.id(),
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscriber::Effect(effect) => write!(f, "Effect({})", effect.id()),
            Subscriber::Computed(computed) => write!(f, "Computed({})", computed.id()),
        }
    }
}

/// Subscribers already reached by one write.
#[derive(Debug, Default)]
pub(crate) struct Notified(HashSet<SubscriberId>);

impl Notified {
    /// Returns `true` the first time an ID is seen.
    pub(crate) fn insert(&mut self, id: SubscriberId) -> bool {
        self.0.insert(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn notified_reports_first_sighting_only() {
        let mut notified = Notified::default();
        let id = SubscriberId::new();

        assert!(notified.insert(id));
        assert!(!notified.insert(id));
        assert!(notified.insert(SubscriberId::new()));
    }
}
