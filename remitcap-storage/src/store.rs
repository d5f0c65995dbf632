//! In-process key/value store with per-entry TTL.
//!
//! An entry is fresh iff `now - stored_at < ttl`. Stale entries are never
//! returned; they are reclaimed on access, by [`CacheStore::purge_expired`],
//! or by the background sweeper in [`crate::sweep`].
//!
//! Operations are synchronous and never hold the lock across an `.await`.
//! Eviction hooks run after the lock is released, so a hook may call back
//! into the store.

use crate::clock::{Clock, SystemClock};
use remitcap_core::CacheSettings;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for a [`CacheStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStoreConfig {
    /// Maximum number of entries; inserting beyond it evicts the oldest.
    pub max_entries: usize,
    /// TTL used by [`CacheStore::set`].
    pub default_ttl: Duration,
    /// Period of the background sweeper.
    pub sweep_interval: Duration,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}

impl CacheStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries,
            default_ttl: settings.default_ttl(),
            sweep_interval: settings.sweep_interval(),
        }
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

// ============================================================================
// EVICTION
// ============================================================================

/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// TTL elapsed; detected on access or by a sweep.
    Expired,
    /// Oldest entry removed to make room.
    Capacity,
    /// Removed by prefix or scope invalidation.
    Invalidated,
    /// Removed by [`CacheStore::delete`].
    Deleted,
    /// Removed by [`CacheStore::clear`].
    Cleared,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Expired => "expired",
            EvictionReason::Capacity => "capacity",
            EvictionReason::Invalidated => "invalidated",
            EvictionReason::Deleted => "deleted",
            EvictionReason::Cleared => "cleared",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked once per removed entry.
pub type EvictionHook = Arc<dyn Fn(&str, EvictionReason) + Send + Sync>;

// ============================================================================
// STATS
// ============================================================================

/// Point-in-time view of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries physically held, including stale ones not yet reclaimed.
    pub size: usize,
    pub max_size: usize,
    /// Held keys, sorted.
    pub keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    /// Entries evicted for capacity.
    pub evictions: u64,
    /// Stale entries reclaimed.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

// ============================================================================
// STORE
// ============================================================================

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
    ttl: Duration,
    /// Insertion order; breaks ties between equal `stored_at`.
    sequence: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    next_sequence: u64,
}

/// Time-bounded, size-bounded key/value store.
///
/// Values of any `'static` type may be stored; reading a key back as a
/// different type behaves like a miss.
pub struct CacheStore {
    entries: Mutex<Entries>,
    config: CacheStoreConfig,
    clock: Arc<dyn Clock>,
    on_evict: Option<EvictionHook>,
    counters: StoreCounters,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.config)
            .field("len", &self.len())
            .field("clock", &self.clock)
            .field("has_eviction_hook", &self.on_evict.is_some())
            .finish()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheStoreConfig::default())
    }
}

impl CacheStore {
    /// Create a store on the system clock.
    pub fn new(config: CacheStoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store on an explicit clock.
    pub fn with_clock(config: CacheStoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            config,
            clock,
            on_evict: None,
            counters: StoreCounters::default(),
        }
    }

    /// Install a callback fired once for every entry that leaves the store.
    pub fn with_eviction_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, EvictionReason) + Send + Sync + 'static,
    {
        self.on_evict = Some(Arc::new(hook));
        self
    }

    pub fn config(&self) -> &CacheStoreConfig {
        &self.config
    }

    // The map holds no cross-entry invariant, so a poisoned lock is usable.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, key: &str, reason: EvictionReason) {
        if let Some(hook) = &self.on_evict {
            hook(key, reason);
        }
    }

    fn capacity(&self) -> usize {
        self.config.max_entries.max(1)
    }

    /// Get a fresh value; stale entries are removed and reported absent.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = self.clock.now();
        let mut expired = false;
        let value = {
            let mut entries = self.lock();
            match entries.map.get(key).map(|entry| entry.is_fresh(now)) {
                Some(true) => entries
                    .map
                    .get(key)
                    .and_then(|entry| entry.value.downcast_ref::<T>().cloned()),
                Some(false) => {
                    entries.map.remove(key);
                    expired = true;
                    None
                }
                None => None,
            }
        };

        if expired {
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            self.notify(key, EvictionReason::Expired);
        }
        if value.is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "cache hit");
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key, expired, "cache miss");
        }
        value
    }

    /// Store a value with the default TTL.
    pub fn set<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.set_with_ttl(key, value, self.config.default_ttl);
    }

    /// Store a value with an explicit TTL.
    ///
    /// Inserting a new key into a full store first evicts the entry with the
    /// oldest `stored_at`, regardless of its remaining TTL. Overwriting an
    /// existing key never evicts.
    pub fn set_with_ttl<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        let stored_at = self.clock.now();
        let evicted = {
            let mut entries = self.lock();
            let evicted = if !entries.map.contains_key(&key)
                && entries.map.len() >= self.capacity()
            {
                let oldest = entries
                    .map
                    .iter()
                    .min_by_key(|(_, entry)| (entry.stored_at, entry.sequence))
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = &oldest {
                    entries.map.remove(oldest);
                }
                oldest
            } else {
                None
            };

            let sequence = entries.next_sequence;
            entries.next_sequence += 1;
            entries.map.insert(
                key.clone(),
                CacheEntry {
                    value: Arc::new(value),
                    stored_at,
                    ttl,
                    sequence,
                },
            );
            evicted
        };

        if let Some(evicted) = evicted {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %evicted, "evicted oldest cache entry");
            self.notify(&evicted, EvictionReason::Capacity);
        }
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set");
    }

    /// Whether a fresh entry exists; stale entries are removed.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let (fresh, expired) = {
            let mut entries = self.lock();
            match entries.map.get(key).map(|entry| entry.is_fresh(now)) {
                Some(true) => (true, false),
                Some(false) => {
                    entries.map.remove(key);
                    (false, true)
                }
                None => (false, false),
            }
        };
        if expired {
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            self.notify(key, EvictionReason::Expired);
        }
        fresh
    }

    /// Remove a key. Returns whether a fresh entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let now = self.clock.now();
        let removed = self.lock().map.remove(key);
        match removed {
            Some(entry) if entry.is_fresh(now) => {
                self.notify(key, EvictionReason::Deleted);
                true
            }
            Some(_) => {
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                self.notify(key, EvictionReason::Expired);
                false
            }
            None => false,
        }
    }

    /// Remove everything. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<String> = {
            let mut entries = self.lock();
            entries.map.drain().map(|(key, _)| key).collect()
        };
        for key in &drained {
            self.notify(key, EvictionReason::Cleared);
        }
        debug!(removed = drained.len(), "cache cleared");
        drained.len()
    }

    /// Remove every key that starts with `prefix`.
    ///
    /// This is a plain prefix test: `"clients:1"` also matches `"clients:10"`.
    /// Use [`CacheStore::invalidate_scope`] for segment-aligned removal.
    pub fn invalidate_by_pattern(&self, prefix: &str) -> usize {
        let removed = self.remove_where(|key| key.starts_with(prefix), EvictionReason::Invalidated);
        debug!(prefix, removed, "invalidated by prefix");
        removed
    }

    /// Remove `scope` itself and every key below `scope:`.
    pub fn invalidate_scope(&self, scope: &str) -> usize {
        let removed = self.remove_where(
            |key| {
                key.strip_prefix(scope)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
            },
            EvictionReason::Invalidated,
        );
        debug!(scope, removed, "invalidated scope");
        removed
    }

    /// Reclaim every stale entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = {
            let mut entries = self.lock();
            let stale: Vec<String> = entries
                .map
                .iter()
                .filter(|(_, entry)| !entry.is_fresh(now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &stale {
                entries.map.remove(key);
            }
            stale
        };
        self.counters
            .expirations
            .fetch_add(removed.len() as u64, Ordering::Relaxed);
        for key in &removed {
            self.notify(key, EvictionReason::Expired);
        }
        removed.len()
    }

    fn remove_where<P>(&self, predicate: P, reason: EvictionReason) -> usize
    where
        P: Fn(&str) -> bool,
    {
        let removed: Vec<String> = {
            let mut entries = self.lock();
            let matching: Vec<String> = entries
                .map
                .keys()
                .filter(|key| predicate(key))
                .cloned()
                .collect();
            for key in &matching {
                entries.map.remove(key);
            }
            matching
        };
        for key in &removed {
            self.notify(key, reason);
        }
        removed.len()
    }

    /// Return the cached value, or await `fetch`, store its result and return it.
    ///
    /// Failed fetches are not cached. Concurrent callers missing on the same
    /// key each run their own fetch; the last one to finish wins the slot.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key) {
            return Ok(value);
        }
        let value = fetch().await?;
        self.set_with_ttl(key, value.clone(), ttl.unwrap_or(self.config.default_ttl));
        Ok(value)
    }

    /// Number of entries physically held, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self.lock().map.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: keys.len(),
            max_size: self.config.max_entries,
            keys,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::AtomicUsize;

    type Log = Arc<Mutex<Vec<(String, EvictionReason)>>>;

    fn store_with(max: usize) -> (CacheStore, Arc<ManualClock>, Log) {
        let clock = Arc::new(ManualClock::new());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let config = CacheStoreConfig::new()
            .with_max_entries(max)
            .with_default_ttl(Duration::from_secs(60));
        let store = CacheStore::with_clock(config, clock.clone())
            .with_eviction_hook(move |key, reason| sink.lock().unwrap().push((key.to_string(), reason)));
        (store, clock, log)
    }

    fn logged(log: &Log) -> Vec<(String, EvictionReason)> {
        let mut entries = log.lock().unwrap().clone();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    #[test]
    fn test_get_and_set() {
        let (store, _, _) = store_with(10);
        assert_eq!(store.get::<String>("missing"), None);

        store.set("k", "v".to_string());
        assert_eq!(store.get::<String>("k").as_deref(), Some("v"));
        assert!(store.has("k"));
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let (store, _, _) = store_with(10);
        store.set("k", 42u32);
        assert_eq!(store.get::<String>("k"), None);
        assert_eq!(store.get::<u32>("k"), Some(42));
    }

    #[test]
    fn test_ttl_expiry_boundary() {
        let (store, clock, log) = store_with(10);
        store.set_with_ttl("k", 1u8, Duration::from_millis(50));

        clock.advance(Duration::from_millis(49));
        assert_eq!(store.get::<u8>("k"), Some(1));

        clock.advance(Duration::from_millis(1));
        assert_eq!(store.get::<u8>("k"), None);
        assert_eq!(store.len(), 0);
        assert_eq!(logged(&log), vec![("k".to_string(), EvictionReason::Expired)]);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_ttl_expiry_real_time() {
        let store = CacheStore::default();
        store.set_with_ttl("k", "v", Duration::from_millis(50));
        assert_eq!(store.get::<&str>("k"), Some("v"));

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(store.get::<&str>("k"), None);
    }

    #[test]
    fn test_has_removes_stale_entry() {
        let (store, clock, _) = store_with(10);
        store.set_with_ttl("k", 1u8, Duration::from_millis(10));
        clock.advance(Duration::from_millis(10));
        assert!(!store.has("k"));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_not_shortest_ttl() {
        let (store, clock, log) = store_with(3);
        store.set_with_ttl("a", 1u8, Duration::from_secs(600));
        clock.advance(Duration::from_millis(1));
        store.set_with_ttl("b", 2u8, Duration::from_millis(5));
        clock.advance(Duration::from_millis(1));
        store.set_with_ttl("c", 3u8, Duration::from_secs(600));
        clock.advance(Duration::from_millis(1));

        // Reading does not refresh age.
        assert_eq!(store.get::<u8>("a"), Some(1));
        store.set("d", 4u8);

        assert_eq!(store.stats().keys, vec!["b", "c", "d"]);
        assert_eq!(logged(&log), vec![("a".to_string(), EvictionReason::Capacity)]);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_capacity_ties_break_on_insertion_order() {
        let (store, _, _) = store_with(2);
        store.set("first", 1u8);
        store.set("second", 2u8);
        store.set("third", 3u8);
        assert_eq!(store.stats().keys, vec!["second", "third"]);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let (store, _, log) = store_with(2);
        store.set("a", 1u8);
        store.set("b", 2u8);
        store.set("a", 3u8);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get::<u8>("a"), Some(3));
        assert!(logged(&log).is_empty());
    }

    #[test]
    fn test_invalidate_by_pattern_is_prefix_only() {
        let (store, _, _) = store_with(10);
        store.set("clients:business:1", 1u8);
        store.set("clients:business:2", 2u8);
        store.set("transfers:business:1", 3u8);
        store.set("old-clients:business:1", 4u8);

        assert_eq!(store.invalidate_by_pattern("clients:"), 2);
        assert_eq!(
            store.stats().keys,
            vec!["old-clients:business:1", "transfers:business:1"]
        );
    }

    #[test]
    fn test_invalidate_scope_respects_segments() {
        let (store, _, log) = store_with(10);
        store.set("eligibility:AB1", 0u8);
        store.set("eligibility:AB1:b1", 1u8);
        store.set("eligibility:AB1:b2", 2u8);
        store.set("eligibility:AB12:b1", 3u8);

        assert_eq!(store.invalidate_scope("eligibility:AB1"), 3);
        assert_eq!(store.stats().keys, vec!["eligibility:AB12:b1"]);
        assert!(logged(&log)
            .iter()
            .all(|(_, reason)| *reason == EvictionReason::Invalidated));
    }

    #[test]
    fn test_delete() {
        let (store, clock, log) = store_with(10);
        store.set("k", 1u8);
        assert!(store.delete("k"));
        assert!(!store.delete("k"));

        store.set_with_ttl("stale", 1u8, Duration::from_millis(1));
        clock.advance(Duration::from_millis(1));
        assert!(!store.delete("stale"));
        assert_eq!(
            logged(&log),
            vec![
                ("k".to_string(), EvictionReason::Deleted),
                ("stale".to_string(), EvictionReason::Expired),
            ]
        );
    }

    #[test]
    fn test_clear_fires_hook_per_entry() {
        let (store, _, log) = store_with(10);
        store.set("a", 1u8);
        store.set("b", 2u8);
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(
            logged(&log),
            vec![
                ("a".to_string(), EvictionReason::Cleared),
                ("b".to_string(), EvictionReason::Cleared),
            ]
        );
    }

    #[test]
    fn test_purge_expired() {
        let (store, clock, _) = store_with(10);
        store.set_with_ttl("short", 1u8, Duration::from_millis(10));
        store.set_with_ttl("long", 2u8, Duration::from_secs(10));
        clock.advance(Duration::from_millis(20));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.stats().keys, vec!["long"]);
        assert_eq!(store.purge_expired(), 0);
    }

    #[test]
    fn test_stats_hit_rate() {
        let (store, _, _) = store_with(10);
        store.set("k", 1u8);
        let _ = store.get::<u8>("k");
        let _ = store.get::<u8>("k");
        let _ = store.get::<u8>("k");
        let _ = store.get::<u8>("nope");

        let stats = store.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 10);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_get_or_set_fetches_once() {
        let (store, _, _) = store_with(10);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let value: Result<u32, String> = store
                .get_or_set("k", None, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_set_does_not_cache_failures() {
        let (store, _, _) = store_with(10);
        let failed: Result<u32, &str> = store.get_or_set("k", None, || async { Err("down") }).await;
        assert_eq!(failed, Err("down"));
        assert!(!store.has("k"));

        let ok: Result<u32, &str> = store.get_or_set("k", None, || async { Ok(1) }).await;
        assert_eq!(ok, Ok(1));
        assert!(store.has("k"));
    }

    #[tokio::test]
    async fn test_get_or_set_does_not_deduplicate_concurrent_misses() {
        let (store, _, _) = store_with(10);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<u32, String>(5)
        };

        let (a, b) = tokio::join!(
            store.get_or_set("k", None, fetch),
            store.get_or_set("k", None, fetch)
        );
        assert_eq!(a, Ok(5));
        assert_eq!(b, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
