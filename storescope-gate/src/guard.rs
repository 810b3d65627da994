//! RAII winner token for the gate.

use crate::error::GateResult;
use crate::gate::ScopeGate;
use std::fmt;
use std::hash::Hash;
use tracing::warn;

/// Proof that the holder won [`ScopeGate::should_start`] for a key.
///
/// Dropping the guard calls `done`, so waiters are released on every exit
/// path of the winning branch, early returns and panics included. Call
/// [`finish`](Self::finish) to observe the `done` result instead.
#[must_use = "dropping the guard immediately releases the key"]
pub struct StartGuard<'a, K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    gate: &'a ScopeGate<K>,
    key: K,
    armed: bool,
}

impl<'a, K> StartGuard<'a, K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub(crate) fn new(gate: &'a ScopeGate<K>, key: K) -> Self {
        Self {
            gate,
            key,
            armed: true,
        }
    }

    /// The claimed key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Releases the key and reports protocol errors.
    pub fn finish(mut self) -> GateResult<()> {
        self.armed = false;
        self.gate.done(&self.key)
    }
}

impl<K> Drop for StartGuard<'_, K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.gate.done(&self.key) {
            warn!(key = ?self.key, %err, "failed to release gate on drop");
        }
    }
}

impl<K> fmt::Debug for StartGuard<'_, K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartGuard")
            .field("key", &self.key)
            .field("armed", &self.armed)
            .finish()
    }
}
