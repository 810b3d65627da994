//! Gate-coordinated, scope-chained configuration reads.

use crate::backend::{ScopeBackend, ScopeValues};
use crate::error::{ConfigError, ConfigResult};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::iter;
use std::sync::Arc;
use storescope_gate::{GateConfig, ScopeGate, WaitOutcome};
use storescope_scope::{Perm, Scope, TypeId, lowest, target_and_parents};
use tracing::{debug, info, warn};

/// Configuration for a [`ConfigLoader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Settings of the loader's coordination gate.
    pub gate: GateConfig,
    /// Reject lookups whose target identifier fails [`TypeId::validate`].
    pub validate_target: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            validate_target: true,
        }
    }
}

/// Reads configuration values along a scope chain, loading each scope once
/// per epoch.
///
/// A scope whose load failed stays failed until [`invalidate`](Self::invalidate).
pub struct ConfigLoader<B> {
    backend: B,
    config: LoaderConfig,
    gate: ScopeGate<TypeId>,
    cache: RwLock<HashMap<TypeId, Arc<ScopeValues>>>,
}

impl<B: ScopeBackend> ConfigLoader<B> {
    /// Creates a loader with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, LoaderConfig::default())
    }

    pub fn with_config(backend: B, config: LoaderConfig) -> Self {
        Self {
            backend,
            gate: ScopeGate::with_config(config.gate.clone()),
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn gate(&self) -> &ScopeGate<TypeId> {
        &self.gate
    }

    /// Looks up `path` for the scope chain described by `ids`.
    ///
    /// `ids[0]` is the requested scope; shallower identifiers in the rest of
    /// `ids` are consulted next, and the default scope last. Returns the first
    /// value found.
    pub fn get(&self, path: &str, ids: &[TypeId]) -> ConfigResult<Option<Value>> {
        self.lookup(path, None, ids)
    }

    /// Like [`get`](Self::get) but skips scopes outside `perm`, so a value
    /// stored at a scope the field does not allow is never returned.
    pub fn get_with_perm(
        &self,
        path: &str,
        perm: Perm,
        ids: &[TypeId],
    ) -> ConfigResult<Option<Value>> {
        self.lookup(path, Some(perm), ids)
    }

    /// Looks up `path` and deserializes the value.
    pub fn get_as<T: DeserializeOwned>(
        &self,
        path: &str,
        ids: &[TypeId],
    ) -> ConfigResult<Option<T>> {
        match self.get(path, ids)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Reduces `ids` to the single scope they share.
    pub fn lowest_scope(&self, ids: &[TypeId]) -> ConfigResult<TypeId> {
        Ok(lowest(ids)?)
    }

    /// Scopes a lookup over `ids` visits, most specific first. Each scope
    /// appears once.
    pub fn lookup_order(&self, ids: &[TypeId]) -> Vec<TypeId> {
        let (target, parents) = target_and_parents(ids);
        iter::once(target)
            .chain(parents.into_iter().filter(|parent| *parent != target))
            .collect()
    }

    /// Returns the rows of `scope`, loading them if no caller has yet.
    pub fn scope_values(&self, scope: TypeId) -> ConfigResult<Arc<ScopeValues>> {
        if let Some(values) = self.cached(scope) {
            return Ok(values);
        }

        if let Some(guard) = self.gate.try_start(&scope) {
            debug!(?scope, "loading scope");
            let values = match self.backend.load(scope) {
                Ok(values) => Arc::new(values),
                Err(err) => {
                    warn!(?scope, %err, "scope load failed");
                    return Err(err);
                }
            };
            self.cache.write().insert(scope, Arc::clone(&values));
            guard.finish()?;
            return Ok(values);
        }

        if self.gate.wait_default(&scope) == WaitOutcome::TimedOut {
            return Err(ConfigError::Timeout { scope });
        }
        self.cached(scope).ok_or(ConfigError::LoadFailed { scope })
    }

    /// Drops every cached scope and starts a new gate epoch.
    ///
    /// Must not run concurrently with lookups.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        let dropped = cache.len();
        cache.clear();
        self.gate.reset();
        info!(dropped, "configuration cache invalidated");
    }

    /// Number of scopes currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    fn cached(&self, scope: TypeId) -> Option<Arc<ScopeValues>> {
        self.cache.read().get(&scope).cloned()
    }

    fn lookup(
        &self,
        path: &str,
        perm: Option<Perm>,
        ids: &[TypeId],
    ) -> ConfigResult<Option<Value>> {
        let order = self.lookup_order(ids);
        if self.config.validate_target
            && let Some(target) = order.first()
        {
            target.validate()?;
        }

        for scope in order {
            let level = scope.scope();
            if level == Scope::Absent || perm.is_some_and(|perm| !perm.has(level)) {
                continue;
            }
            if let Some(value) = self.scope_values(scope)?.get(path) {
                debug!(path, ?scope, "configuration value resolved");
                return Ok(Some(value.clone()));
            }
        }
        Ok(None)
    }
}
