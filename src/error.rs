//! Error types for coalesce.
//!
//! The merge path is total: partitioning, arbitration, and reconciliation
//! never fail over well-formed inputs. The only fallible operation in the
//! crate is building an [`EntityState`](crate::EntityState), so the error
//! surface is correspondingly small.

use thiserror::Error;

/// Errors raised while constructing an entity state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The builder was finished without an identifier map. An empty map is
    /// acceptable; an absent one is not.
    #[error("entity state requires an identifier map (an empty map is allowed)")]
    MissingIdentifiers,

    /// The builder was finished without metadata.
    #[error("entity state requires metadata")]
    MissingMetadata,
}
