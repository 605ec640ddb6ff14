//! Subscriber Index
//!
//! Two parallel tables map `subject -> key -> subscribers`, one for effects
//! and one for computed values. They are kept apart because the two kinds
//! are notified differently: effects re-run, computed values invalidate.
//!
//! The graph is generic over the stored subscriber handles so it carries no
//! knowledge of how a subscriber is run. Callers snapshot the subscribers of
//! a key, release the graph, and only then run user code.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::node::{Key, Source, SubjectId};
use crate::reactive::SubscriberId;

/// Subscribers found for one written key, in notification order.
pub struct Notification<E, C> {
    /// Computed values to invalidate. Resolved first.
    pub computeds: SmallVec<[C; 4]>,
    /// Effects subscribed directly to the key.
    pub effects: SmallVec<[E; 4]>,
}

impl<E, C> Notification<E, C> {
    pub fn is_empty(&self) -> bool {
        self.computeds.is_empty() && self.effects.is_empty()
    }
}

/// `subject -> key -> ordered set of subscribers` for one subscriber kind.
struct SubscriberTable<S> {
    index: HashMap<SubjectId, HashMap<Key, IndexMap<SubscriberId, S>>>,
}

impl<S: Clone> SubscriberTable<S> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
        }
    }

    /// Returns `true` if the subscriber was not already present.
    fn insert(&mut self, subject: SubjectId, key: &str, id: SubscriberId, subscriber: S) -> bool {
        let keys = self.index.entry(subject).or_default();
        if let Some(set) = keys.get_mut(key) {
            if set.contains_key(&id) {
                return false;
            }
            set.insert(id, subscriber);
            return true;
        }

        let mut set = IndexMap::new();
        set.insert(id, subscriber);
        keys.insert(Arc::from(key), set);
        true
    }

    fn remove(&mut self, subject: SubjectId, key: &str, id: SubscriberId) {
        if let Some(keys) = self.index.get_mut(&subject) {
            if let Some(set) = keys.get_mut(key) {
                set.shift_remove(&id);
                if set.is_empty() {
                    keys.remove(key);
                }
            }
            if keys.is_empty() {
                self.index.remove(&subject);
            }
        }
    }

    fn snapshot(&self, subject: SubjectId, key: &str) -> SmallVec<[S; 4]> {
        self.index
            .get(&subject)
            .and_then(|keys| keys.get(key))
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    fn count(&self, subject: SubjectId, key: &str) -> usize {
        self.index
            .get(&subject)
            .and_then(|keys| keys.get(key))
            .map_or(0, IndexMap::len)
    }

    fn clear(&mut self) {
        self.index.clear();
    }
}

/// The dependency graph shared by every primitive of one runtime.
///
/// `E` is the effect handle type and `C` the computed handle type.
pub struct DependencyGraph<E, C> {
    effects: SubscriberTable<E>,
    computeds: SubscriberTable<C>,

    /// Every (subject, key) a computed value subscribed to during its last
    /// derivation, so the subscriptions can be dropped before it re-derives.
    sources: HashMap<SubscriberId, SmallVec<[Source; 4]>>,
}

impl<E: Clone, C: Clone> DependencyGraph<E, C> {
    pub fn new() -> Self {
        Self {
            effects: SubscriberTable::new(),
            computeds: SubscriberTable::new(),
            sources: HashMap::new(),
        }
    }

    /// Subscribe an effect to reads of `subject.key`. Idempotent.
    pub fn add_effect(&mut self, subject: SubjectId, key: &str, id: SubscriberId, effect: E) -> bool {
        self.effects.insert(subject, key, id, effect)
    }

    /// Subscribe a computed value to reads of `subject.key`. Idempotent.
    pub fn add_computed(
        &mut self,
        subject: SubjectId,
        key: &str,
        id: SubscriberId,
        computed: C,
    ) -> bool {
        let added = self.computeds.insert(subject, key, id, computed);
        if added {
            self.sources
                .entry(id)
                .or_default()
                .push(Source::new(subject, key));
        }
        added
    }

    /// Drop every subscription held by a computed value.
    pub fn clear_computed(&mut self, id: SubscriberId) {
        if let Some(sources) = self.sources.remove(&id) {
            for source in sources {
                self.computeds.remove(source.subject, &source.key, id);
            }
        }
    }

    /// The subscribers to notify for a write to `subject.key`.
    pub fn subscribers(&self, subject: SubjectId, key: &str) -> Notification<E, C> {
        Notification {
            computeds: self.computeds.snapshot(subject, key),
            effects: self.effects.snapshot(subject, key),
        }
    }

    /// Number of subscribers of either kind for `subject.key`.
    pub fn subscriber_count(&self, subject: SubjectId, key: &str) -> usize {
        self.effects.count(subject, key) + self.computeds.count(subject, key)
    }

    /// Sources a computed value currently subscribes to.
    pub fn sources_of(&self, id: SubscriberId) -> &[Source] {
        self.sources.get(&id).map(|s| s.as_slice()).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.effects.clear();
        self.computeds.clear();
        self.sources.clear();
    }
}

impl<E: Clone, C: Clone> Default for DependencyGraph<E, C> {
    fn default() -> Self {
        Self::new()
    }
}
