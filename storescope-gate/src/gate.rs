//! Keyed start/wait/done gate.
//!
//! The gate is a control-flow primitive without I/O and without values: it
//! tells exactly one caller per key to run, and parks every other caller
//! until the runner reports back. Results travel through whatever store the
//! caller chooses.

use crate::error::{GateError, GateResult};
use crate::guard::StartGuard;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storescope_scope::TypeId;
use tracing::{debug, warn};

/// Configuration for a [`ScopeGate`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Capacity reserved for the key table on init and reset.
    pub initial_capacity: usize,
    /// Deadline used by [`ScopeGate::wait_default`]; `None` waits forever.
    pub wait_timeout: Option<Duration>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            wait_timeout: None,
        }
    }
}

/// Observable state of a key within the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Running,
    Done,
}

/// Result of a deadline-bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Nothing to wait for: the key was never started or already finished.
    NotRunning,
    /// The runner called `done` while we were parked.
    Done,
    /// The deadline passed while the key was still running.
    TimedOut,
}

impl WaitOutcome {
    /// Mirrors [`ScopeGate::should_wait`]: true only if we actually waited
    /// for a completion.
    #[must_use]
    pub const fn waited(self) -> bool {
        matches!(self, WaitOutcome::Done)
    }
}

/// Wake-up signal shared by the runner and the waiters of one key.
struct Signal {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn release(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    fn wait_until(&self, deadline: Instant) -> bool {
        let mut done = self.done.lock();
        while !*done {
            if self.cond.wait_until(&mut done, deadline).timed_out() {
                return *done;
            }
        }
        true
    }
}

/// Per-key entry. `Done` drops the signal so finished keys cost one tag.
enum WaitState {
    Running(Arc<Signal>),
    Done,
}

/// A table of per-key wait states.
///
/// Within one epoch (from [`init`](Self::init) or [`reset`](Self::reset) to
/// the next `reset`) each key can be claimed once:
///
/// ```
/// use storescope_gate::ScopeGate;
/// use storescope_scope::Scope;
///
/// let gate = ScopeGate::new();
/// let key = Scope::Store.with_id(1);
/// if gate.should_start(&key) {
///     // load, then publish the result somewhere else
///     gate.done(&key).unwrap();
/// } else if gate.should_wait(&key) {
///     // someone else loaded it; read the published result
/// }
/// ```
///
/// The table lock is only held for lookups and state flips, never across a
/// wait.
pub struct ScopeGate<K = TypeId> {
    config: GateConfig,
    table: RwLock<Option<HashMap<K, WaitState>>>,
}

impl<K> ScopeGate<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Creates an initialized gate with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    /// Creates an initialized gate.
    #[must_use]
    pub fn with_config(config: GateConfig) -> Self {
        let table = HashMap::with_capacity(config.initial_capacity);
        Self {
            config,
            table: RwLock::new(Some(table)),
        }
    }

    /// Creates a gate that answers "not applicable" to everything until
    /// [`init`](Self::init) is called.
    #[must_use]
    pub fn uninitialized(config: GateConfig) -> Self {
        Self {
            config,
            table: RwLock::new(None),
        }
    }

    /// Allocates the key table. Idempotent.
    pub fn init(&self) {
        let mut table = self.table.write();
        if table.is_none() {
            *table = Some(HashMap::with_capacity(self.config.initial_capacity));
            debug!("coordination gate initialized");
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.table.read().is_some()
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Claims `key` for the caller.
    ///
    /// Returns true for exactly one caller per key and epoch; that caller
    /// must eventually call [`done`](Self::done). Never blocks beyond the
    /// table lock. An uninitialized gate returns false.
    pub fn should_start(&self, key: &K) -> bool {
        let mut table = self.table.write();
        let Some(map) = table.as_mut() else {
            return false;
        };
        if map.contains_key(key) {
            return false;
        }
        map.insert(key.clone(), WaitState::Running(Arc::new(Signal::new())));
        debug!(?key, "gate claimed");
        true
    }

    /// Like [`should_start`](Self::should_start) but hands back a guard that
    /// calls `done` when dropped.
    pub fn try_start(&self, key: &K) -> Option<StartGuard<'_, K>> {
        self.should_start(key).then(|| StartGuard::new(self, key.clone()))
    }

    /// Blocks while `key` is running.
    ///
    /// Returns false immediately if the key was never started or has already
    /// finished; otherwise parks until the runner calls `done` and returns
    /// true.
    pub fn should_wait(&self, key: &K) -> bool {
        let Some(signal) = self.running_signal(key) else {
            return false;
        };
        debug!(?key, "waiting for gate");
        signal.wait();
        true
    }

    /// Deadline-bounded variant of [`should_wait`](Self::should_wait).
    pub fn wait_timeout(&self, key: &K, timeout: Duration) -> WaitOutcome {
        let Some(signal) = self.running_signal(key) else {
            return WaitOutcome::NotRunning;
        };
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            signal.wait();
            return WaitOutcome::Done;
        };
        if signal.wait_until(deadline) {
            WaitOutcome::Done
        } else {
            warn!(?key, ?timeout, "timed out waiting for gate");
            WaitOutcome::TimedOut
        }
    }

    /// Waits using [`GateConfig::wait_timeout`].
    pub fn wait_default(&self, key: &K) -> WaitOutcome {
        match self.config.wait_timeout {
            Some(timeout) => self.wait_timeout(key, timeout),
            None if self.should_wait(key) => WaitOutcome::Done,
            None => WaitOutcome::NotRunning,
        }
    }

    /// Marks `key` finished and wakes all its waiters.
    ///
    /// Calling `done` twice for the same key is a no-op. Calling it for a key
    /// that was never started, or on an uninitialized gate, is a protocol
    /// violation.
    pub fn done(&self, key: &K) -> GateResult<()> {
        let signal = {
            let mut table = self.table.write();
            let map = table.as_mut().ok_or(GateError::NotInitialized)?;
            let state = map.get_mut(key).ok_or_else(|| GateError::NotStarted {
                key: format!("{key:?}"),
            })?;
            match std::mem::replace(state, WaitState::Done) {
                WaitState::Running(signal) => signal,
                WaitState::Done => {
                    debug!(?key, "gate already done");
                    return Ok(());
                }
            }
        };
        signal.release();
        debug!(?key, "gate released");
        Ok(())
    }

    /// Starts a new epoch by forgetting every key.
    ///
    /// Must not race with in-flight work. Keys still running are released so
    /// their waiters do not hang, and their runners' later `done` calls will
    /// fail with [`GateError::NotStarted`].
    pub fn reset(&self) {
        let mut table = self.table.write();
        let Some(map) = table.as_mut() else {
            return;
        };
        let cleared = map.len();
        let mut running = 0usize;
        for (_, state) in map.drain() {
            if let WaitState::Running(signal) = state {
                running += 1;
                signal.release();
            }
        }
        map.shrink_to(self.config.initial_capacity);
        if running > 0 {
            warn!(cleared, running, "gate reset with keys still running");
        } else {
            debug!(cleared, "gate reset");
        }
    }

    /// Returns the state of `key` in the current epoch.
    #[must_use]
    pub fn state(&self, key: &K) -> Option<KeyState> {
        let table = self.table.read();
        table.as_ref()?.get(key).map(|state| match state {
            WaitState::Running(_) => KeyState::Running,
            WaitState::Done => KeyState::Done,
        })
    }

    /// Number of keys claimed in the current epoch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().as_ref().map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys whose runner has not called `done` yet.
    #[must_use]
    pub fn running_len(&self) -> usize {
        self.table.read().as_ref().map_or(0, |map| {
            map.values()
                .filter(|state| matches!(state, WaitState::Running(_)))
                .count()
        })
    }

    fn running_signal(&self, key: &K) -> Option<Arc<Signal>> {
        let table = self.table.read();
        match table.as_ref()?.get(key)? {
            WaitState::Running(signal) => Some(Arc::clone(signal)),
            WaitState::Done => None,
        }
    }
}

impl<K> Default for ScopeGate<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for ScopeGate<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGate")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("len", &self.len())
            .field("running", &self.running_len())
            .finish()
    }
}
