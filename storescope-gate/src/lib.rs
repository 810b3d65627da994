//! Per-scope coordination for storescope.
//!
//! [`ScopeGate`] guarantees that at most one expensive operation runs per key
//! at a time. Callers ask:
//!
//! - [`ScopeGate::should_start`] — "am I the one who runs?" (exactly one caller gets `true`)
//! - [`ScopeGate::should_wait`] — "is someone running? then park until they finish"
//! - [`ScopeGate::done`] — "I finished", waking every parked caller
//!
//! The gate never stores the computed value; publishing and reading results
//! is up to the caller. Keys default to [`storescope_scope::TypeId`] but any
//! `Eq + Hash + Clone + Debug` type works.

mod error;
mod gate;
mod guard;

pub use error::{GateError, GateResult};
pub use gate::{GateConfig, KeyState, ScopeGate, WaitOutcome};
pub use guard::StartGuard;
