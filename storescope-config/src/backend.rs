//! Storage seam for scoped configuration rows.

use crate::error::{ConfigError, ConfigResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use storescope_scope::TypeId;

/// All configuration values stored at one scope, keyed by path
/// (for example `web/secure/base_url`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeValues(HashMap<String, Value>);

impl ScopeValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.get(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(path.into(), value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for ScopeValues {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Source of configuration rows, one scope at a time.
///
/// Loads are expensive (a database round trip in production), which is why
/// the loader funnels them through the gate.
pub trait ScopeBackend: Send + Sync {
    /// Returns every value stored at exactly `scope`.
    fn load(&self, scope: TypeId) -> ConfigResult<ScopeValues>;
}

impl<B: ScopeBackend + ?Sized> ScopeBackend for Arc<B> {
    fn load(&self, scope: TypeId) -> ConfigResult<ScopeValues> {
        (**self).load(scope)
    }
}

/// In-memory backend, used by tests and the diagnostic CLI.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: RwLock<HashMap<TypeId, ScopeValues>>,
    failing: RwLock<HashSet<TypeId>>,
    delay: Option<Duration>,
    loads: AtomicUsize,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every load sleep for `delay`, simulating a slow store.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stores `value` at `path` for `scope`.
    pub fn set(&self, scope: TypeId, path: impl Into<String>, value: Value) {
        self.rows.write().entry(scope).or_default().insert(path, value);
    }

    /// Makes loads of `scope` fail.
    pub fn fail_scope(&self, scope: TypeId) {
        self.failing.write().insert(scope);
    }

    /// Number of `load` calls so far.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ScopeBackend for MemoryBackend {
    fn load(&self, scope: TypeId) -> ConfigResult<ScopeValues> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.failing.read().contains(&scope) {
            return Err(ConfigError::Backend(format!("scope {scope:?} unavailable")));
        }
        Ok(self.rows.read().get(&scope).cloned().unwrap_or_default())
    }
}
