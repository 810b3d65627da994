//! Scope identifiers for storescope.
//!
//! This crate defines the fundamental scope types shared by every other
//! storescope crate:
//! - [`Scope`] — the ordered hierarchy `Absent < Default < Website < Group < Store`
//! - [`TypeId`] — a scope and a numeric ID packed into one `u32`
//! - [`Perm`] — the set of scopes a configuration value may be set at
//! - Resolution helpers ([`target_and_parents`], [`lowest`]) that reduce a
//!   set of identifiers to the scope a lookup should run against
//!
//! A `TypeId` is cheap to copy, totally ordered, hashable and shardable
//! (see [`TypeId::segment`]), so it doubles as a coordination key.

mod resolver;
mod scope;
mod type_id;

pub use resolver::{lowest, target_and_parents};
pub use scope::{Perm, Scope};
pub use type_id::{DEFAULT_TYPE_ID, MAX_ID, TypeId};

/// Result type alias using the crate's error type.
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

/// Errors that can occur while building, validating or decoding scopes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// Semantically invalid scope or identifier set.
    #[error("not valid: {0}")]
    NotValid(String),

    /// Malformed binary or text payload.
    #[error("bad encoding: {0}")]
    BadEncoding(String),
}
