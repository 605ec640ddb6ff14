//! Dependency Graph
//!
//! This module implements the index that connects observable subjects to the
//! computations that read them.
//!
//! # Overview
//!
//! Every tracked read records an edge `(subject, key) -> subscriber`. A write
//! to `(subject, key)` looks up those edges to decide what to notify:
//!
//! - computed values subscribed to the key are invalidated (lazy, they
//!   re-derive on their next read);
//! - effects subscribed to the key re-run immediately.
//!
//! Effects and computed values live in separate tables because they follow
//! different notification policies. Computed values additionally keep a
//! reverse list of their sources so that a re-derivation can start from a
//! fresh dependency set; effects never drop their subscriptions.

mod deps;
mod node;

pub use deps::{DependencyGraph, Notification};
pub use node::{Key, Source, SubjectId, VALUE_KEY};
