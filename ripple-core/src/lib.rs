//! Ripple Core
//!
//! This crate provides a minimal reactive state runtime. It implements:
//!
//! - Reactive records with deep, lazily wrapped nested records
//! - Ref cells for single values
//! - Lazy, memoized computed values with dynamic dependency tracking
//! - Effects that re-run synchronously when their dependencies change
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Reactive primitives and the runtime that tracks them
//! - `graph`: The `(subject, key) -> subscribers` dependency table
//! - `value`: The dynamic value model stored in reactive records
//! - `config`: Runtime settings
//! - `error`: The crate's error type
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{record, Runtime};
//!
//! let rt = Runtime::new();
//! let state = rt.reactive(record! { "count" => 0 });
//!
//! // Create a derived value
//! let s = state.clone();
//! let doubled = rt.computed(move || s.get("count").as_i64().unwrap_or_default() * 2);
//!
//! // Create an effect
//! let (s, d) = (state.clone(), doubled.clone());
//! rt.effect(move || {
//!     println!("Count: {:?}, Doubled: {}", s.get("count"), d.get());
//! });
//!
//! // Update the state
//! state.set("count", 5);
//! // Effect automatically runs, prints: "Count: Value(5), Doubled: 10"
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod value;

pub use config::{CyclePolicy, RuntimeConfig};
pub use error::{ReactiveError, Result};
pub use reactive::{
    computed, effect, reactive, ref_cell, untracked, Computed, Effect, Field, MaybeReactive,
    Reactive, Ref, Runtime, SubscriberId,
};
pub use value::{Record, Value};
