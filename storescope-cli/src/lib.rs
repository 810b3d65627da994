//! Building blocks of the `storescope` diagnostic binary.
//!
//! Kept in a library so the formatting and the gate stress run can be tested
//! without spawning the binary.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use storescope_gate::ScopeGate;
use storescope_scope::{MAX_ID, Scope, ScopeError, ScopeResult, TypeId};
use tracing::{debug, error};

/// Parses an identifier written as `scope:id`, a bare scope name, or the
/// raw decimal value.
///
/// ```
/// use storescope_cli::parse_type_id;
/// use storescope_scope::Scope;
///
/// assert_eq!(parse_type_id("stores:3").unwrap(), Scope::Store.with_id(3));
/// assert_eq!(parse_type_id("default").unwrap(), Scope::Default.with_id(0));
/// ```
pub fn parse_type_id(input: &str) -> ScopeResult<TypeId> {
    let input = input.trim();
    if let Some((scope, id)) = input.split_once(':') {
        let scope: Scope = scope.parse()?;
        let id: i64 = id
            .parse()
            .map_err(|e| ScopeError::BadEncoding(format!("id {id:?}: {e}")))?;
        return TypeId::checked_pack(scope, id);
    }
    if input.starts_with(|c: char| c.is_ascii_digit()) {
        return input.parse();
    }
    TypeId::checked_pack(input.parse()?, 0)
}

/// Everything the codec knows about one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    pub raw: u32,
    pub scope: Scope,
    pub id: i64,
    pub valid: bool,
    pub segment: u8,
    pub binary: String,
}

impl Description {
    #[must_use]
    pub fn of(type_id: TypeId) -> Self {
        let (scope, id) = type_id.unpack();
        Self {
            raw: type_id.raw(),
            scope,
            id,
            valid: type_id.is_valid(),
            segment: type_id.segment(),
            binary: hex::encode(type_id.to_le_bytes()),
        }
    }
}

impl std::fmt::Display for Description {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} raw={} le={} segment={} valid={}",
            self.scope, self.id, self.raw, self.binary, self.segment, self.valid
        )
    }
}

/// Most distinct store keys a stress run can address.
pub const MAX_STRESS_KEYS: usize = MAX_ID as usize + 1;

/// Parameters of a gate stress run.
#[derive(Debug, Clone)]
pub struct StressOptions {
    /// Number of distinct store keys.
    pub keys: usize,
    /// Threads hammering every key.
    pub workers: usize,
    /// Simulated duration of the guarded work.
    pub work: Duration,
}

impl Default for StressOptions {
    fn default() -> Self {
        Self {
            keys: 64,
            workers: 8,
            work: Duration::from_millis(2),
        }
    }
}

/// Outcome of a stress run. `winners == keys` means the gate held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StressReport {
    pub keys: usize,
    pub workers: usize,
    pub winners: usize,
    pub waited: usize,
    pub skipped: usize,
    pub elapsed_ms: u128,
}

impl StressReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.winners == self.keys
            && self.winners + self.waited + self.skipped == self.keys * self.workers
    }
}

/// Drives the canonical start/wait/done pattern from `workers` threads over
/// `keys` store identifiers.
///
/// Fails when `keys` exceeds [`MAX_STRESS_KEYS`].
pub fn stress(options: &StressOptions) -> ScopeResult<StressReport> {
    if options.keys > MAX_STRESS_KEYS {
        return Err(ScopeError::NotValid(format!(
            "{} keys exceed the {MAX_STRESS_KEYS} distinct store ids",
            options.keys
        )));
    }
    let keys: Arc<Vec<TypeId>> = Arc::new(
        (0..=MAX_ID)
            .take(options.keys)
            .map(|n| Scope::Store.with_id(n))
            .collect(),
    );
    let gate: Arc<ScopeGate> = Arc::new(ScopeGate::new());
    let barrier = Arc::new(Barrier::new(options.workers));
    let winners = Arc::new(AtomicUsize::new(0));
    let waited = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));

    let started = Instant::now();
    let handles: Vec<_> = (0..options.workers)
        .map(|worker| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            let winners = Arc::clone(&winners);
            let waited = Arc::clone(&waited);
            let skipped = Arc::clone(&skipped);
            let keys = Arc::clone(&keys);
            let work = options.work;
            thread::spawn(move || {
                barrier.wait();
                // Each worker walks the keys from a different offset.
                for i in 0..keys.len() {
                    let key = keys[(i + worker) % keys.len()];
                    if let Some(guard) = gate.try_start(&key) {
                        thread::sleep(work);
                        winners.fetch_add(1, Ordering::Relaxed);
                        drop(guard);
                    } else if gate.should_wait(&key) {
                        waited.fetch_add(1, Ordering::Relaxed);
                    } else {
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                }
                debug!(worker, "stress worker finished");
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            error!("stress worker panicked");
        }
    }

    Ok(StressReport {
        keys: options.keys,
        workers: options.workers,
        winners: winners.load(Ordering::Relaxed),
        waited: waited.load(Ordering::Relaxed),
        skipped: skipped.load(Ordering::Relaxed),
        elapsed_ms: started.elapsed().as_millis(),
    })
}
