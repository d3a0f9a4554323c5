//! # Coalesce - Incremental Entity Resolution
//!
//! Coalesce folds a stream of partial observations into a canonical
//! collection of entity states. Each observation carries a map of
//! identifier evidence (for example `MMSI -> "503123456"`,
//! `callsign -> "VJN2"`) plus opaque metadata. Observations may overlap,
//! conflict, or be more or less trustworthy than what is already known;
//! the merge engine decides, per observation, which existing states to
//! absorb, which conflicting identifiers to split off, and which metadata
//! wins.
//!
//! ## Core Concepts
//!
//! - **`EntityState`**: an identifier map plus metadata; equality and
//!   hashing consider identifiers only
//! - **`MergePolicy`**: caller-supplied reliability orderings, a
//!   mergeability gate, and a metadata combiner
//! - **`System`**: the storage contract - match lookup plus atomic commit
//! - **`MergeEngine`**: the reconciliation algorithm itself
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use coalesce::{EntityState, FnPolicy, InMemorySystem, System};
//!
//! // Keys rank by recency-independent reliability; here "a" outranks "b".
//! let policy = FnPolicy::new(
//!     |a: &&str, b: &&str| a < b,
//!     |a: &u64, b: &u64| a > b,
//!     |_a, _b| true,
//!     |a: &u64, b: &u64| *a.max(b),
//! );
//! let mut system = InMemorySystem::new(policy);
//!
//! let observation = EntityState::new(HashMap::from([("a", 1)]), 7u64);
//! system.merge(observation);
//! assert_eq!(system.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod memory;
pub mod merge;
pub mod policy;
pub mod report;
pub mod state;
pub mod system;

// Re-export primary types at crate root for convenience
pub use error::StateError;
pub use memory::InMemorySystem;
pub use merge::{MergeEngine, MergeResult, ValuePair};
pub use policy::{FnPolicy, MergePolicy};
pub use report::{Report, ReportPolicy};
pub use state::{EntityState, EntityStateBuilder};
pub use system::System;
