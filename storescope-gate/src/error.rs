//! Error types for the coordination gate.

use thiserror::Error;

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Call-protocol violations. Every variant is a bug in the caller, not a
/// condition to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The gate was used before [`ScopeGate::init`](crate::ScopeGate::init).
    #[error("fatal: coordination gate is not initialized")]
    NotInitialized,

    /// `done` was called for a key that never won `should_start`.
    #[error("fatal: done called for key {key} which was never started")]
    NotStarted { key: String },
}

impl GateError {
    /// Every gate error is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        true
    }
}
