//! Reactive Context
//!
//! The reactive context tracks which computations are currently running, so
//! that a read can register them as dependents.
//!
//! # Implementation
//!
//! Each runtime keeps two stacks per thread: one for effects and one for
//! computed values. A read registers against the top of both, which is how
//! a computed value derived inside an effect subscribes both of them.
//!
//! Entering a context returns a guard that pops the frame when dropped, so
//! the stacks stay balanced when a computation panics. An untracked frame
//! pushes a barrier onto both stacks, hiding every enclosing frame.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::subscriber::{ComputedRef, EffectRef, Subscriber, SubscriberId};

/// A stack entry: an active subscriber, or a barrier that disables tracking.
enum Frame<S> {
    Active(S),
    Barrier,
}

impl<S> Frame<S> {
    fn active(&self) -> Option<&S> {
        match self {
            Frame::Active(subscriber) => Some(subscriber),
            Frame::Barrier => None,
        }
    }
}

#[derive(Default)]
struct Stacks {
    effects: SmallVec<[Frame<EffectRef>; 4]>,
    computeds: SmallVec<[Frame<ComputedRef>; 4]>,
}

impl Stacks {
    fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.computeds.is_empty()
    }
}

/// The subscribers a read should register against.
#[derive(Default)]
pub(crate) struct Active {
    pub(crate) effect: Option<EffectRef>,
    pub(crate) computed: Option<ComputedRef>,
}

impl Active {
    pub(crate) fn is_empty(&self) -> bool {
        self.effect.is_none() && self.computed.is_none()
    }
}

/// Per-thread context stacks of one runtime.
#[derive(Default)]
pub(crate) struct Contexts {
    by_thread: Mutex<HashMap<ThreadId, Stacks>>,
}

impl Contexts {
    /// Push a subscriber onto the stack for its kind.
    pub(crate) fn enter(&self, subscriber: Subscriber) -> ContextGuard<'_> {
        let id = subscriber.id();
        let mut by_thread = self.by_thread.lock();
        let stacks = by_thread.entry(thread::current().id()).or_default();

        let frame = match subscriber {
            Subscriber::Effect(effect) => {
                stacks.effects.push(Frame::Active(effect));
                GuardFrame::Effect(id)
            }
            Subscriber::Computed(computed) => {
                stacks.computeds.push(Frame::Active(computed));
                GuardFrame::Computed(id)
            }
        };

        ContextGuard {
            contexts: self,
            frame,
        }
    }

    /// Push a barrier onto both stacks.
    pub(crate) fn enter_untracked(&self) -> ContextGuard<'_> {
        let mut by_thread = self.by_thread.lock();
        let stacks = by_thread.entry(thread::current().id()).or_default();
        stacks.effects.push(Frame::Barrier);
        stacks.computeds.push(Frame::Barrier);

        ContextGuard {
            contexts: self,
            frame: GuardFrame::Untracked,
        }
    }

    /// The effect and computed value on top of this thread's stacks.
    pub(crate) fn active(&self) -> Active {
        let by_thread = self.by_thread.lock();
        match by_thread.get(&thread::current().id()) {
            Some(stacks) => Active {
                effect: stacks.effects.last().and_then(Frame::active).cloned(),
                computed: stacks.computeds.last().and_then(Frame::active).cloned(),
            },
            None => Active::default(),
        }
    }

    /// Whether a read on this thread would register anywhere.
    pub(crate) fn is_tracking(&self) -> bool {
        !self.active().is_empty()
    }

    fn exit(&self, frame: &GuardFrame) {
        let mut by_thread = self.by_thread.lock();
        let thread_id = thread::current().id();
        let Some(stacks) = by_thread.get_mut(&thread_id) else {
            return;
        };

        match frame {
            GuardFrame::Effect(expected) => {
                let popped = stacks.effects.pop();
                debug_assert!(
                    matches!(&popped, Some(Frame::Active(e)) if e.id() == *expected),
                    "effect context mismatch: expected {expected}"
                );
            }
            GuardFrame::Computed(expected) => {
                let popped = stacks.computeds.pop();
                debug_assert!(
                    matches!(&popped, Some(Frame::Active(c)) if c.id() == *expected),
                    "computed context mismatch: expected {expected}"
                );
            }
            GuardFrame::Untracked => {
                let effect = stacks.effects.pop();
                let computed = stacks.computeds.pop();
                debug_assert!(
                    matches!(effect, Some(Frame::Barrier))
                        && matches!(computed, Some(Frame::Barrier)),
                    "untracked context mismatch"
                );
            }
        }

        if stacks.is_empty() {
            by_thread.remove(&thread_id);
        }
    }

    /// Drop every stack. Outstanding guards become no-ops.
    pub(crate) fn clear(&self) {
        self.by_thread.lock().clear();
    }
}

enum GuardFrame {
    Effect(SubscriberId),
    Computed(SubscriberId),
    Untracked,
}

/// Pops its frame when dropped, including during unwinding.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub(crate) struct ContextGuard<'a> {
    contexts: &'a Contexts,
    frame: GuardFrame,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.contexts.exit(&self.frame);
    }
}

/// The threads currently executing one subscriber's body.
///
/// Re-entry is only a cycle when it happens on a thread that is already
/// inside the body. Other threads may run the same subscriber concurrently.
#[derive(Default)]
pub(crate) struct Reentrancy {
    threads: Mutex<SmallVec<[ThreadId; 2]>>,
}

impl Reentrancy {
    /// Whether the calling thread is inside the body.
    pub(crate) fn is_entered(&self) -> bool {
        let current = thread::current().id();
        self.threads.lock().contains(&current)
    }

    /// Mark the calling thread as inside the body until the guard drops.
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        let thread = thread::current().id();
        self.threads.lock().push(thread);
        ReentrancyGuard {
            reentrancy: self,
            thread,
        }
    }
}

#[must_use = "the body is marked as exited as soon as the guard is dropped"]
pub(crate) struct ReentrancyGuard<'a> {
    reentrancy: &'a Reentrancy,
    thread: ThreadId,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        let mut threads = self.reentrancy.threads.lock();
        if let Some(pos) = threads.iter().rposition(|t| *t == self.thread) {
            threads.remove(pos);
        }
    }
}
