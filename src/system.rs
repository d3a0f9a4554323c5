//! The system contract: policy access, match lookup, and atomic commit.
//!
//! A [`System`] owns the canonical collection of entity states and the
//! policy that governs merging. The engine only ever needs two things from
//! it per merge: one `matches` read and one `update` commit. Everything
//! else - how states are indexed, persisted, or shared - belongs to the
//! implementation.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::merge::MergeEngine;
use crate::policy::MergePolicy;
use crate::state::EntityState;

/// A collection of entity states plus the rules for merging them.
///
/// # Concurrency
///
/// The merge engine is pure and synchronous; consistency is entirely the
/// implementation's concern. `matches` and the subsequent `update` must
/// act as one logical critical section per [`System::merge`] call, or
/// concurrent callers over overlapping identifiers can lose updates.
/// Enforce that externally - a lock around the system, or sharding of
/// incoming observations by identifier.
pub trait System<K, V, M>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
    M: Clone,
{
    /// The policy governing reliability, mergeability, and combination.
    fn policy(&self) -> &dyn MergePolicy<K, V, M>;

    /// A restartable snapshot of the current entity states. Order is not
    /// significant.
    fn entity_states(&self) -> Box<dyn Iterator<Item = &EntityState<K, V, M>> + '_>;

    /// Every stored state sharing at least one exact (key, value) pair
    /// with `identifiers`.
    ///
    /// This is the sole indexing responsibility the engine delegates
    /// outward. No false negatives are tolerated; the reconciliation loop
    /// assumes the returned set is exact.
    fn matches(&self, identifiers: &HashMap<K, V>) -> HashSet<EntityState<K, V, M>>;

    /// Atomically removes every state in `remove` and inserts every state
    /// in `add`.
    ///
    /// One logical transaction: removing an already-absent state is a
    /// no-op, and a state present in both `remove` and `add` (same
    /// identifier map, different metadata) ends up present exactly once,
    /// carrying the inserted value.
    fn update(&mut self, remove: &[EntityState<K, V, M>], add: HashSet<EntityState<K, V, M>>);

    /// Reconciles `incoming` against the collection and commits the
    /// result.
    ///
    /// Convenience composition of [`MergeEngine::merge`] and
    /// [`System::update`].
    fn merge(&mut self, incoming: EntityState<K, V, M>)
    where
        Self: Sized,
    {
        let result = MergeEngine::merge(&*self, incoming);
        self.update(&result.matches, result.new_states);
    }

    /// Collects the current states into a set (snapshot convenience,
    /// mostly for assertions and tests).
    fn to_set(&self) -> HashSet<EntityState<K, V, M>> {
        self.entity_states().cloned().collect()
    }
}
