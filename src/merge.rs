//! The merge engine: reconciling one incoming state against the system.
//!
//! Given an incoming [`EntityState`], the engine finds every stored state
//! sharing at least one identifier pair with it, then folds through them
//! least-reliable-first, deciding at each step whether the running
//! candidate and the match describe one entity (merge) or two that
//! coincidentally share evidence (split). The result is a removal list
//! (the exact matched pre-images) and a set of replacement states.
//!
//! No identifier evidence is silently discarded: a pair either survives in
//! the merged winner, is returned to the pool as a split fragment, or is
//! overwritten by a more reliable conflicting value for the same key - the
//! only documented loss path.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::policy::MergePolicy;
use crate::state::EntityState;
use crate::system::System;

/// The two values observed for one conflicting identifier key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePair<V> {
    /// Value held by the first (candidate) state.
    pub left: V,
    /// Value held by the second (matched) state.
    pub right: V,
}

/// Outcome of a merge computation, prior to commit.
///
/// `matches` is the exact set of stored states the engine reconciled
/// against, in processing order; the caller removes precisely these.
/// `new_states` are the replacements to insert. Duplicate identifier maps
/// collapse per [`EntityState`] equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult<K, V, M>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    /// Stored states to remove, least-reliable first.
    pub matches: Vec<EntityState<K, V, M>>,
    /// States to insert in their place.
    pub new_states: HashSet<EntityState<K, V, M>>,
}

/// Identifier pairs present in both states with equal values.
#[must_use]
pub fn common<K, V, M>(a: &EntityState<K, V, M>, b: &EntityState<K, V, M>) -> HashMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Clone,
{
    a.identifiers()
        .iter()
        .filter(|(k, v)| b.identifiers().get(k) == Some(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Identifier keys present in both states with unequal values.
#[must_use]
pub fn conflicting<K, V, M>(
    a: &EntityState<K, V, M>,
    b: &EntityState<K, V, M>,
) -> HashMap<K, ValuePair<V>>
where
    K: Eq + Hash + Clone,
    V: Eq + Clone,
{
    let mut map = HashMap::new();
    for (k, av) in a.identifiers() {
        if let Some(bv) = b.identifiers().get(k) {
            if bv != av {
                map.insert(
                    k.clone(),
                    ValuePair {
                        left: av.clone(),
                        right: bv.clone(),
                    },
                );
            }
        }
    }
    map
}

/// Identifier pairs whose key is present in exactly one of the states.
#[must_use]
pub fn exclusive<K, V, M>(a: &EntityState<K, V, M>, b: &EntityState<K, V, M>) -> HashMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let mut map = HashMap::new();
    for (k, v) in a.identifiers() {
        if !b.identifiers().contains_key(k) {
            map.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in b.identifiers() {
        if !a.identifiers().contains_key(k) {
            map.insert(k.clone(), v.clone());
        }
    }
    map
}

/// The single most reliable key in `keys` under the policy ordering.
fn best_key<'a, K, V, M, I>(policy: &dyn MergePolicy<K, V, M>, keys: I) -> Option<&'a K>
where
    K: Eq + Hash,
    I: Iterator<Item = &'a K>,
{
    keys.reduce(|best, k| if policy.key_outranks(k, best) { k } else { best })
}

/// Decides whether the shared evidence outweighs the conflicting evidence.
///
/// Empty `conflicting` always outweighs. Otherwise only the single most
/// reliable key on each side is weighed - counts are ignored, so one
/// strong conflicting key vetoes any number of weak agreeing keys.
fn outweighs<K, V, M>(
    policy: &dyn MergePolicy<K, V, M>,
    common: &HashMap<K, V>,
    conflicting: &HashMap<K, ValuePair<V>>,
) -> bool
where
    K: Eq + Hash,
{
    if conflicting.is_empty() {
        return true;
    }
    if common.is_empty() {
        return false;
    }
    match (
        best_key(policy, common.keys()),
        best_key(policy, conflicting.keys()),
    ) {
        (Some(a), Some(b)) => policy.key_outranks(a, b),
        _ => false,
    }
}

/// The stateless reconciliation algorithm.
///
/// The engine holds nothing between invocations; all state lives in the
/// caller's [`System`]. [`MergeEngine::merge`] performs no I/O and only
/// allocates maps and sets local to the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine;

impl MergeEngine {
    /// Reconciles `incoming` against every stored state it overlaps with.
    ///
    /// Matches are processed in ascending order of their single most
    /// reliable identifier key, so the least reliable match is consumed
    /// first and the most reliable last - a strong match encountered late
    /// can still win cleanly against the accumulated candidate, while
    /// earlier weak matches have their conflicting identifiers stripped
    /// and returned to the pool rather than dropped.
    ///
    /// At each step the candidate `p` and match `f` are partitioned into
    /// [`common`], [`conflicting`], and [`exclusive`] evidence, and the
    /// less reliable of the two (by metadata) is either absorbed or split
    /// off:
    ///
    /// - **merge** (shared evidence outweighs conflicts and the policy
    ///   gate holds): the survivor keeps everything the more reliable side
    ///   had plus all exclusive evidence, with combined metadata;
    /// - **split**: the less reliable side cedes the genuinely shared
    ///   identifiers to the winner and survives as a fragment of whatever
    ///   evidence remains, if any.
    ///
    /// The returned removal list is exactly the matched pre-images; the
    /// caller commits both halves atomically via
    /// [`System::update`](crate::System::update).
    #[must_use]
    pub fn merge<K, V, M, S>(system: &S, incoming: EntityState<K, V, M>) -> MergeResult<K, V, M>
    where
        K: Eq + Hash + Clone,
        V: Eq + Hash + Clone,
        M: Clone,
        S: System<K, V, M> + ?Sized,
    {
        let policy = system.policy();
        let mut matches: Vec<EntityState<K, V, M>> = system
            .matches(incoming.identifiers())
            .into_iter()
            .collect();
        matches.sort_by(|a, b| {
            let x = best_key(policy, a.identifiers().keys());
            let y = best_key(policy, b.identifiers().keys());
            match (x, y) {
                (Some(x), Some(y)) => {
                    if policy.key_outranks(x, y) {
                        std::cmp::Ordering::Greater
                    } else if policy.key_outranks(y, x) {
                        std::cmp::Ordering::Less
                    } else {
                        // Equally reliable top keys: relative order is
                        // unspecified, but the comparator must stay
                        // consistent so the sort never panics.
                        std::cmp::Ordering::Equal
                    }
                }
                (Some(_), None) => std::cmp::Ordering::Greater,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });

        let mut new_states: HashSet<EntityState<K, V, M>> = HashSet::new();
        let mut p = incoming;
        for f in &matches {
            if p.is_empty() {
                // Fully absorbed; nothing left to reconcile.
                break;
            }
            let shared = common(&p, f);
            let disputed = conflicting(&p, f);
            let unique = exclusive(&p, f);
            let (min, max) = if policy.metadata_outranks(p.metadata(), f.metadata()) {
                (f, &p)
            } else {
                (&p, f)
            };
            if outweighs(policy, &shared, &disputed) && policy.mergeable(&p, f) {
                let mut ids = max.identifiers().clone();
                ids.extend(unique);
                let metadata = policy.combine(p.metadata(), f.metadata());
                p = EntityState::new(ids, metadata);
            } else {
                // Different entity: cede the shared identifiers to the
                // winner, keep whatever evidence remains as a fragment.
                let mut ids = min.identifiers().clone();
                for k in shared.keys() {
                    ids.remove(k);
                }
                if !ids.is_empty() {
                    new_states.insert(EntityState::new(ids, min.metadata().clone()));
                }
                p = max.clone();
            }
        }
        if !p.is_empty() {
            new_states.insert(p);
        }
        MergeResult {
            matches,
            new_states,
        }
    }
}
