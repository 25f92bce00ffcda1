//! Memoizing cache in front of the upstream quote source.
//!
//! `Memoizer` stores the outcome (value or error) of a computation per key and replays it
//! while the entry is fresh, so a scraper polling the same symbols at a fixed cadence
//! causes at most one upstream call per key and freshness window. Its operations:
//!
//! - `Memoizer::lookup(key, compute)`: serve a fresh entry, or run `compute` and store
//!   its outcome.
//! - `Memoizer::evict_expired()`: drop entries past their retention window; driven by
//!   the background thread started with `spawn_sweeper`.
//!
//! Design notes:
//! - Every key owns a slot with its own mutex, held across `compute`. Concurrent misses on
//!   one key therefore collapse into a single upstream call, while lookups on different
//!   keys only contend on the short map lock used to find the slot.
//! - Entries are replaced whole, so a poisoned lock still guards a consistent entry and is
//!   recovered instead of propagated.
//! - When a refresh fails while an older success is still inside its retention window,
//!   that success keeps being served and is marked fresh for one more window. Its
//!   retention deadline never moves.
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, select, tick};
use log::{debug, warn};
use quote_common::{AssetType, Quote, QuoteError, Symbol};
use thiserror::Error;

/// Source of monotonic time for cache bookkeeping.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Cache key for one upstream quote call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    asset_type: AssetType,
    symbol: String,
}

impl QuoteKey {
    /// Key for `symbol` looked up as `asset_type`; symbol case is ignored.
    pub fn new(asset_type: AssetType, symbol: &Symbol) -> Self {
        Self {
            asset_type,
            symbol: symbol.normalized(),
        }
    }
}

/// The cache used for quote lookups.
pub type QuoteCache = Memoizer<QuoteKey, Quote, QuoteError>;

/// Result of `Memoizer::lookup`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<V, E> {
    /// Stored or freshly computed outcome.
    pub outcome: Result<V, E>,
    /// `true` when the outcome was served without calling `compute`.
    pub from_cache: bool,
}

struct CacheEntry<V, E> {
    outcome: Result<V, E>,
    computed_at: Instant,
    fresh_until: Instant,
    expires_at: Instant,
}

type Slot<V, E> = Arc<Mutex<Option<CacheEntry<V, E>>>>;

/// Key-to-outcome store with a freshness window and a longer retention window.
pub struct Memoizer<K, V, E> {
    slots: Mutex<HashMap<K, Slot<V, E>>>,
    fresh_for: Duration,
    retain_for: Duration,
    clock: Arc<dyn Clock>,
}

/// Raised when the retention window is shorter than the freshness window.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("retention window {retain_for:?} is shorter than freshness window {fresh_for:?}")]
pub struct InvalidWindows {
    /// Requested freshness window.
    pub fresh_for: Duration,
    /// Requested retention window.
    pub retain_for: Duration,
}

impl<K, V, E> Memoizer<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone + std::fmt::Display,
{
    /// Create a cache driven by the system clock.
    pub fn new(fresh_for: Duration, retain_for: Duration) -> Result<Self, InvalidWindows> {
        Self::with_clock(fresh_for, retain_for, Arc::new(SystemClock))
    }

    /// Create a cache driven by `clock`.
    pub fn with_clock(
        fresh_for: Duration,
        retain_for: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, InvalidWindows> {
        if retain_for < fresh_for {
            return Err(InvalidWindows {
                fresh_for,
                retain_for,
            });
        }
        Ok(Self {
            slots: Mutex::new(HashMap::new()),
            fresh_for,
            retain_for,
            clock,
        })
    }

    /// Return the outcome stored under `key`, computing it first when the entry is
    /// missing or no longer fresh.
    pub fn lookup<F>(&self, key: &K, compute: F) -> Lookup<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(key);
        let mut entry = lock(&slot);

        let now = self.clock.now();
        if let Some(cached) = entry.as_ref() {
            if now < cached.fresh_until && now < cached.expires_at {
                return Lookup {
                    outcome: cached.outcome.clone(),
                    from_cache: true,
                };
            }
        }

        let outcome = compute();
        let computed_at = self.clock.now();

        if let Err(err) = &outcome {
            if let Some(stale) = entry.as_mut() {
                if stale.outcome.is_ok() && computed_at < stale.expires_at {
                    warn!(
                        "Refresh failed ({}); serving value computed {:?} ago",
                        err,
                        computed_at.saturating_duration_since(stale.computed_at)
                    );
                    stale.fresh_until = deadline(computed_at, self.fresh_for).min(stale.expires_at);
                    return Lookup {
                        outcome: stale.outcome.clone(),
                        from_cache: true,
                    };
                }
            }
        }

        *entry = Some(CacheEntry {
            outcome: outcome.clone(),
            computed_at,
            fresh_until: deadline(computed_at, self.fresh_for),
            expires_at: deadline(computed_at, self.retain_for),
        });
        Lookup {
            outcome,
            from_cache: false,
        }
    }

    /// Drop every entry past its retention window. Returns how many were removed.
    ///
    /// Slots in use by a concurrent lookup are left alone.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = lock(&self.slots);
        let before = slots.len();
        slots.retain(|_, slot| {
            // Another handle means a lookup is using the slot right now.
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => entry.as_ref().is_some_and(|e| now < e.expires_at),
                Err(_) => true,
            }
        });
        before - slots.len()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    fn slot(&self, key: &K) -> Slot<V, E> {
        let mut slots = lock(&self.slots);
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}

/// `start + window`, shortened to the latest representable instant when the sum
/// overflows the platform clock.
fn deadline(start: Instant, window: Duration) -> Instant {
    let mut window = window;
    loop {
        if let Some(at) = start.checked_add(window) {
            return at;
        }
        window /= 2;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Spawn a thread evicting expired entries from `cache` every `interval` until a message
/// arrives on (or the sender of) `shutdown_rx`.
pub fn spawn_sweeper<K, V, E>(
    cache: Arc<Memoizer<K, V, E>>,
    interval: Duration,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
    E: Clone + std::fmt::Display + Send + 'static,
{
    thread::spawn(move || {
        let ticker = tick(interval);
        loop {
            select! {
                recv(shutdown_rx) -> _ => break,
                recv(ticker) -> _ => {
                    let evicted = cache.evict_expired();
                    if evicted > 0 {
                        debug!("Evicted {} expired cache entries, {} left", evicted, cache.len());
                    }
                }
            }
        }
        debug!("Cache sweeper stopped");
    })
}
