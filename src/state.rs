//! Entity state values and identifier-based identity.
//!
//! An [`EntityState`] is the unit the whole crate revolves around: a map of
//! identifier evidence attributed to one real-world entity, plus an opaque
//! metadata payload (a timestamp, a position, a provenance record - the
//! engine never looks inside it except through the caller's policy).
//!
//! Identity is the identifier map and nothing else. Two states with equal
//! identifier maps compare equal and hash equal even when their metadata
//! differs; set membership, match lookup, and commit semantics all rely on
//! this. Callers must therefore never hold two states with the same
//! identifier map in one collection - the merge engine always replaces
//! rather than duplicates.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// An immutable set of identifier evidence plus metadata.
///
/// Generic over the identifier key type `K`, the identifier value type
/// `V`, and the metadata type `M`. Every transformation produces a new
/// state; there are no in-place mutators.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use coalesce::EntityState;
///
/// let a = EntityState::new(HashMap::from([("mmsi", "503123456")]), 10u64);
/// let b = EntityState::new(HashMap::from([("mmsi", "503123456")]), 99u64);
///
/// // Metadata is invisible to equality.
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState<K, V, M>
where
    K: Eq + Hash,
{
    identifiers: HashMap<K, V>,
    metadata: M,
}

impl<K, V, M> EntityState<K, V, M>
where
    K: Eq + Hash,
{
    /// Creates an entity state from an identifier map and metadata.
    #[must_use]
    pub fn new(identifiers: HashMap<K, V>, metadata: M) -> Self {
        Self {
            identifiers,
            metadata,
        }
    }

    /// Starts a builder for incremental construction.
    #[must_use]
    pub fn builder() -> EntityStateBuilder<K, V, M> {
        EntityStateBuilder::new()
    }

    /// Returns the identifier evidence attributed to this entity.
    #[must_use]
    pub fn identifiers(&self) -> &HashMap<K, V> {
        &self.identifiers
    }

    /// Returns the metadata payload.
    #[must_use]
    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Returns true if this state carries no identifier evidence.
    ///
    /// An empty state is legal as a value but is never committed: the
    /// engine drops fully-consumed candidates instead of inserting them.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Consumes the state, returning the identifier map and metadata.
    #[must_use]
    pub fn into_parts(self) -> (HashMap<K, V>, M) {
        (self.identifiers, self.metadata)
    }
}

impl<K, V, M> PartialEq for EntityState<K, V, M>
where
    K: Eq + Hash,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.identifiers == other.identifiers
    }
}

impl<K, V, M> Eq for EntityState<K, V, M>
where
    K: Eq + Hash,
    V: Eq,
{
}

impl<K, V, M> Hash for EntityState<K, V, M>
where
    K: Eq + Hash,
    V: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order-independent: XOR-combine one sub-hash per entry so that
        // equal maps hash equal regardless of iteration order.
        let mut acc: u64 = 0;
        for (k, v) in &self.identifiers {
            let mut entry = DefaultHasher::new();
            k.hash(&mut entry);
            v.hash(&mut entry);
            acc ^= entry.finish();
        }
        state.write_usize(self.identifiers.len());
        state.write_u64(acc);
    }
}

impl<K, V, M> fmt::Display for EntityState<K, V, M>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityState({:?})", self.identifiers)
    }
}

/// Builder for creating [`EntityState`] instances.
///
/// Ensures the identifier map is present before building. An empty map is
/// valid; a never-supplied one is a construction error.
#[derive(Debug)]
pub struct EntityStateBuilder<K, V, M> {
    identifiers: Option<HashMap<K, V>>,
    metadata: Option<M>,
}

impl<K, V, M> EntityStateBuilder<K, V, M>
where
    K: Eq + Hash,
{
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            identifiers: None,
            metadata: None,
        }
    }

    /// Sets the full identifier map, replacing any pairs added so far.
    #[must_use]
    pub fn identifiers(mut self, identifiers: HashMap<K, V>) -> Self {
        self.identifiers = Some(identifiers);
        self
    }

    /// Adds a single identifier pair, overwriting any previous value for
    /// the key.
    #[must_use]
    pub fn identifier(mut self, key: K, value: V) -> Self {
        self.identifiers.get_or_insert_with(HashMap::new).insert(key, value);
        self
    }

    /// Sets the metadata payload.
    #[must_use]
    pub fn metadata(mut self, metadata: M) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Builds the entity state.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::MissingIdentifiers`] if no identifier map was
    /// supplied, or [`StateError::MissingMetadata`] if no metadata was.
    pub fn build(self) -> Result<EntityState<K, V, M>, StateError> {
        let identifiers = self.identifiers.ok_or(StateError::MissingIdentifiers)?;
        let metadata = self.metadata.ok_or(StateError::MissingMetadata)?;
        Ok(EntityState {
            identifiers,
            metadata,
        })
    }
}

impl<K, V, M> Default for EntityStateBuilder<K, V, M>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
