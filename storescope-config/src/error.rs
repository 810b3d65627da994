//! Error types for the configuration loader.

use storescope_gate::GateError;
use storescope_scope::{ScopeError, TypeId};
use thiserror::Error;

/// Result type for loader operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading scoped configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid scope identifier or identifier set.
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),

    /// Gate protocol violation.
    #[error("gate error: {0}")]
    Gate(#[from] GateError),

    /// The backend could not produce the rows of a scope.
    #[error("backend error: {0}")]
    Backend(String),

    /// Another caller loaded the scope and failed; nothing was published.
    #[error("loading scope {scope:?} failed in another caller")]
    LoadFailed { scope: TypeId },

    /// Gave up waiting for another caller to load the scope.
    #[error("timed out waiting for scope {scope:?}")]
    Timeout { scope: TypeId },

    /// A stored value did not match the requested type.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
