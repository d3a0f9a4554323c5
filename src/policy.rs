//! Merge policies: the caller-supplied rules the engine arbitrates with.
//!
//! The engine itself decides nothing about reliability. Which identifier
//! key is more trustworthy, which metadata is fresher, whether two states
//! are physically allowed to be the same entity, and how metadata combines
//! are all supplied here, as an explicit policy value rather than by
//! subclassing the system.
//!
//! # Preconditions
//!
//! Both `*_outranks` relations must be strict total orders. The engine
//! does not verify this; an inconsistent policy (ties, non-transitivity)
//! produces unspecified - though never panicking - merge outcomes, because
//! match ordering and arbitration stop being well defined.

use std::hash::Hash;

use crate::state::EntityState;

/// Reliability ordering, mergeability, and metadata combination rules.
///
/// Implement this on a policy type, or use [`FnPolicy`] to assemble one
/// from closures.
pub trait MergePolicy<K, V, M>: Send + Sync
where
    K: Eq + Hash,
{
    /// Returns true if and only if identifier key `a` is more reliable
    /// than key `b` at naming the underlying entity (an MMSI outranks a
    /// free-text vessel name).
    fn key_outranks(&self, a: &K, b: &K) -> bool;

    /// Returns true if and only if metadata `a` is more reliable (for
    /// example, more recent) than metadata `b`.
    fn metadata_outranks(&self, a: &M, b: &M) -> bool;

    /// Domain plausibility gate: may `a` and `b` describe the same
    /// entity? Even perfectly agreeing identifiers do not merge when this
    /// returns false (two reports seconds apart from opposite sides of an
    /// ocean are not one vessel).
    fn mergeable(&self, a: &EntityState<K, V, M>, b: &EntityState<K, V, M>) -> bool;

    /// Combines two metadata values into the survivor's metadata.
    fn combine(&self, a: &M, b: &M) -> M;
}

/// A [`MergePolicy`] assembled from four closures.
///
/// Useful in tests and for callers whose rules are configuration rather
/// than a dedicated type. Policy variations (such as disabling the
/// mergeability gate) are expressed by constructing a different instance,
/// never by flipping shared mutable switches.
///
/// # Examples
///
/// ```
/// use coalesce::FnPolicy;
///
/// // Lexicographically smaller keys are more reliable, later timestamps
/// // win, everything is mergeable.
/// let policy: FnPolicy<&str, u32, u64> = FnPolicy::new(
///     |a: &&str, b: &&str| a < b,
///     |a: &u64, b: &u64| a > b,
///     |_a, _b| true,
///     |a: &u64, b: &u64| *a.max(b),
/// );
/// ```
pub struct FnPolicy<K, V, M>
where
    K: Eq + Hash,
{
    key_outranks: Box<dyn Fn(&K, &K) -> bool + Send + Sync>,
    metadata_outranks: Box<dyn Fn(&M, &M) -> bool + Send + Sync>,
    #[allow(clippy::type_complexity)]
    mergeable: Box<dyn Fn(&EntityState<K, V, M>, &EntityState<K, V, M>) -> bool + Send + Sync>,
    combine: Box<dyn Fn(&M, &M) -> M + Send + Sync>,
}

impl<K, V, M> FnPolicy<K, V, M>
where
    K: Eq + Hash,
{
    /// Assembles a policy from the four rules.
    #[must_use]
    pub fn new(
        key_outranks: impl Fn(&K, &K) -> bool + Send + Sync + 'static,
        metadata_outranks: impl Fn(&M, &M) -> bool + Send + Sync + 'static,
        mergeable: impl Fn(&EntityState<K, V, M>, &EntityState<K, V, M>) -> bool + Send + Sync + 'static,
        combine: impl Fn(&M, &M) -> M + Send + Sync + 'static,
    ) -> Self {
        Self {
            key_outranks: Box::new(key_outranks),
            metadata_outranks: Box::new(metadata_outranks),
            mergeable: Box::new(mergeable),
            combine: Box::new(combine),
        }
    }
}

impl<K, V, M> MergePolicy<K, V, M> for FnPolicy<K, V, M>
where
    K: Eq + Hash,
{
    fn key_outranks(&self, a: &K, b: &K) -> bool {
        (self.key_outranks)(a, b)
    }

    fn metadata_outranks(&self, a: &M, b: &M) -> bool {
        (self.metadata_outranks)(a, b)
    }

    fn mergeable(&self, a: &EntityState<K, V, M>, b: &EntityState<K, V, M>) -> bool {
        (self.mergeable)(a, b)
    }

    fn combine(&self, a: &M, b: &M) -> M {
        (self.combine)(a, b)
    }
}

impl<K, V, M> std::fmt::Debug for FnPolicy<K, V, M>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnPolicy")
    }
}
