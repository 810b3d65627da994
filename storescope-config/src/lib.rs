//! Scoped configuration loading for storescope.
//!
//! [`ConfigLoader`] reads configuration values along the scope chain
//! `Store -> Website -> Default`. Each scope's rows are fetched from a
//! [`ScopeBackend`] at most once per epoch, however many requests ask for
//! them concurrently: the first caller loads through the
//! [`ScopeGate`](storescope_gate::ScopeGate), the rest wait and then read the
//! loader's own cache.

mod backend;
mod error;
mod loader;

pub use backend::{MemoryBackend, ScopeBackend, ScopeValues};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, LoaderConfig};
