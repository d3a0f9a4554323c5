//! In-memory system backed by an inverted identifier index.
//!
//! [`InMemorySystem`] is a complete, single-process [`System`]: a state
//! set plus an inverted index from (key, value) to the states carrying
//! that pair, maintained incrementally on every commit. `matches` is a
//! union of index buckets over the query pairs - amortized O(pairs) - not
//! a scan of the whole collection.
//!
//! Suitable for embedded use and tests. It is an owner type (`&mut self`
//! commits); callers needing shared access wrap it in their own lock so
//! the read and the commit of one merge form a single critical section.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::policy::MergePolicy;
use crate::state::EntityState;
use crate::system::System;

/// An in-process [`System`] with O(pairs) match lookup.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use coalesce::{EntityState, FnPolicy, InMemorySystem, System};
///
/// let policy = FnPolicy::new(
///     |a: &&str, b: &&str| a < b,
///     |a: &u64, b: &u64| a > b,
///     |_a, _b| true,
///     |a: &u64, b: &u64| *a.max(b),
/// );
/// let mut system = InMemorySystem::new(policy);
/// system.merge(EntityState::new(HashMap::from([("mmsi", "503123456")]), 1u64));
/// system.merge(EntityState::new(
///     HashMap::from([("mmsi", "503123456"), ("callsign", "VJN2")]),
///     2u64,
/// ));
/// assert_eq!(system.len(), 1);
/// ```
#[derive(Debug)]
pub struct InMemorySystem<K, V, M, P>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    policy: P,
    states: HashSet<EntityState<K, V, M>>,
    index: HashMap<(K, V), HashSet<EntityState<K, V, M>>>,
}

impl<K, V, M, P> InMemorySystem<K, V, M, P>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
    M: Clone,
    P: MergePolicy<K, V, M>,
{
    /// Creates an empty system governed by `policy`.
    #[must_use]
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            states: HashSet::new(),
            index: HashMap::new(),
        }
    }

    /// Creates a system pre-seeded with `states`, bypassing merge
    /// reconciliation (the states are inserted as-is).
    #[must_use]
    pub fn with_states(
        policy: P,
        states: impl IntoIterator<Item = EntityState<K, V, M>>,
    ) -> Self {
        let mut system = Self::new(policy);
        for state in states {
            system.insert(state);
        }
        system
    }

    /// Number of entity states currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if the system holds no entity states.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns the stored state with exactly this identifier map, if any.
    ///
    /// Resolved through the inverted index: any one pair of the query
    /// narrows the candidates to its bucket, which is then checked for an
    /// exact identifier-map match. An empty query map never matches
    /// (states are reachable only through their identifier pairs).
    #[must_use]
    pub fn get(&self, identifiers: &HashMap<K, V>) -> Option<&EntityState<K, V, M>> {
        let (k, v) = identifiers.iter().next()?;
        self.index
            .get(&(k.clone(), v.clone()))?
            .iter()
            .find(|state| state.identifiers() == identifiers)
            .and_then(|state| self.states.get(state))
    }

    fn insert(&mut self, state: EntityState<K, V, M>) {
        for (k, v) in state.identifiers() {
            self.index
                .entry((k.clone(), v.clone()))
                .or_default()
                .replace(state.clone());
        }
        // replace, not insert: an identifier-equal state must not shadow
        // the incoming metadata.
        self.states.replace(state);
    }

    fn remove(&mut self, state: &EntityState<K, V, M>) {
        if !self.states.remove(state) {
            return;
        }
        for (k, v) in state.identifiers() {
            let key = (k.clone(), v.clone());
            if let Some(bucket) = self.index.get_mut(&key) {
                bucket.remove(state);
                if bucket.is_empty() {
                    self.index.remove(&key);
                }
            }
        }
    }
}

impl<K, V, M, P> System<K, V, M> for InMemorySystem<K, V, M, P>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
    M: Clone,
    P: MergePolicy<K, V, M>,
{
    fn policy(&self) -> &dyn MergePolicy<K, V, M> {
        &self.policy
    }

    fn entity_states(&self) -> Box<dyn Iterator<Item = &EntityState<K, V, M>> + '_> {
        Box::new(self.states.iter())
    }

    fn matches(&self, identifiers: &HashMap<K, V>) -> HashSet<EntityState<K, V, M>> {
        let mut out = HashSet::new();
        for (k, v) in identifiers {
            if let Some(bucket) = self.index.get(&(k.clone(), v.clone())) {
                out.extend(bucket.iter().cloned());
            }
        }
        out
    }

    fn update(&mut self, remove: &[EntityState<K, V, M>], add: HashSet<EntityState<K, V, M>>) {
        // Removals first so a replace (same identifiers, new metadata)
        // lands exactly once with the inserted value.
        for state in remove {
            self.remove(state);
        }
        for state in add {
            self.insert(state);
        }
    }
}
