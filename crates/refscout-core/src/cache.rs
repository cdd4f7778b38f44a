//! Shared, bounded caches.
//!
//! Two shapes live here:
//!
//! - [`BoundedCache`]: max-entry LRU with per-entry TTL, used for team/org
//!   profiles and repository listings. Expiry is checked lazily on lookup,
//!   not by a background sweep. Recency is tracked through a `VecDeque`
//!   queue; stale queue items ("ghost keys") left behind by re-touches are
//!   detected by stamp comparison and skipped during eviction.
//! - [`PrMetadataCache`]: per-pull-request title/contributor entries with
//!   no TTL. It is reconciled explicitly against the set of identifiers
//!   still open on the host after each pull-request stage.
//!
//! `BoundedCache::get_or_compute` is single-flight: two discovery runs
//! requesting the same absent key perform one fetch; the second caller
//! blocks and receives the first caller's result, or its failure, wrapped
//! in a clone.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::HostError;

/// Hard upper bound on entries for any one cache instance.
pub const MAX_CACHE_ENTRIES: usize = 10_000;

/// Default maximum entries per cache.
pub const DEFAULT_CACHE_ENTRIES: usize = 100;

/// Default per-entry TTL (30 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Sizing and expiry settings for a [`BoundedCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries; least-recently-used entries are evicted
    /// beyond this. Clamped to [`MAX_CACHE_ENTRIES`].
    pub max_entries: usize,
    /// Per-entry time-to-live, checked lazily on lookup.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_ENTRIES,
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    /// Last-touch stamp; the recency queue item carrying the same stamp is
    /// the live one, earlier items for this key are ghosts.
    stamp: u64,
}

struct InflightFetch<V> {
    slot: Mutex<Option<Result<V, HostError>>>,
    ready: Condvar,
}

impl<V: Clone> InflightFetch<V> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn fill(&self, outcome: Result<V, HostError>) {
        let mut slot = self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<V, HostError> {
        let mut slot = self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

struct CacheState<K, V> {
    entries: HashMap<K, Entry<V>>,
    recency: VecDeque<(K, u64)>,
    inflight: HashMap<K, Arc<InflightFetch<V>>>,
    next_stamp: u64,
}

/// Bounded LRU + TTL cache with single-flight loading.
pub struct BoundedCache<K, V> {
    config: CacheConfig,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let config = CacheConfig {
            max_entries: config.max_entries.min(MAX_CACHE_ENTRIES).max(1),
            ttl: config.ttl,
        };
        Self {
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                recency: VecDeque::new(),
                inflight: HashMap::new(),
                next_stamp: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<K, V>> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns the cached value for `key` when present and fresh, touching
    /// its recency. Expired entries are removed and reported as a miss.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.lock();
        Self::lookup_fresh(&mut state, key, self.config.ttl)
    }

    fn lookup_fresh(state: &mut CacheState<K, V>, key: &K, ttl: Duration) -> Option<V> {
        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() >= ttl,
        };
        if expired {
            tracing::debug!("cache entry expired, removing lazily");
            state.entries.remove(key);
            return None;
        }
        let stamp = state.next_stamp;
        state.next_stamp += 1;
        let entry = state.entries.get_mut(key)?;
        entry.stamp = stamp;
        state.recency.push_back((key.clone(), stamp));
        Some(entry.value.clone())
    }

    fn insert_locked(state: &mut CacheState<K, V>, key: K, value: V, max_entries: usize) {
        let stamp = state.next_stamp;
        state.next_stamp += 1;
        state.entries.insert(
            key.clone(),
            Entry {
                value,
                inserted_at: Instant::now(),
                stamp,
            },
        );
        state.recency.push_back((key, stamp));

        while state.entries.len() > max_entries {
            let Some((candidate, queue_stamp)) = state.recency.pop_front() else {
                break;
            };
            let is_live = state
                .entries
                .get(&candidate)
                .is_some_and(|entry| entry.stamp == queue_stamp);
            if is_live {
                tracing::debug!("evicting least-recently-used cache entry");
                state.entries.remove(&candidate);
            }
            // Ghost key: a later touch superseded this queue item.
        }
    }

    /// Returns the value for `key`, fetching it at most once across
    /// concurrent callers.
    ///
    /// # Errors
    ///
    /// Propagates the fetch failure; concurrent waiters receive a clone of
    /// the first caller's failure.
    pub fn get_or_compute(
        &self,
        key: K,
        fetch: impl FnOnce() -> Result<V, HostError>,
    ) -> Result<V, HostError> {
        // Fast path: fresh entry, or an in-flight fetch to wait on.
        let inflight = {
            let mut state = self.lock();
            if let Some(value) = Self::lookup_fresh(&mut state, &key, self.config.ttl) {
                return Ok(value);
            }
            if let Some(pending) = state.inflight.get(&key) {
                Some(Arc::clone(pending))
            } else {
                let pending = Arc::new(InflightFetch::new());
                state.inflight.insert(key.clone(), Arc::clone(&pending));
                None
            }
        };
        if let Some(pending) = inflight {
            return pending.wait();
        }

        // This caller is the leader; fetch without holding the lock.
        let outcome = fetch();

        let mut state = self.lock();
        if let Some(pending) = state.inflight.remove(&key) {
            pending.fill(outcome.clone());
        }
        if let Ok(value) = &outcome {
            Self::insert_locked(&mut state, key, value.clone(), self.config.max_entries);
        }
        outcome
    }

    /// Number of live entries (expired entries may still be counted until
    /// their lazy removal).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry and any recency bookkeeping.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.recency.clear();
    }
}

/// Cached per-pull-request display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrMetadata {
    /// Pull request title at listing time.
    pub title: String,
    /// Contributor identity.
    pub author: String,
}

/// Per-pull-request metadata store, reconciled against live identifiers
/// rather than expired by TTL.
#[derive(Default)]
pub struct PrMetadataCache {
    entries: Mutex<HashMap<u64, PrMetadata>>,
}

impl PrMetadataCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, PrMetadata>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Stores metadata for one pull request.
    pub fn insert(&self, id: u64, metadata: PrMetadata) {
        self.lock().insert(id, metadata);
    }

    /// Returns the cached metadata for `id`.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<PrMetadata> {
        self.lock().get(&id).cloned()
    }

    /// Evicts every entry whose identifier is no longer live; returns the
    /// number pruned.
    pub fn retain_live(&self, live: &BTreeSet<u64>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|id, _| live.contains(id));
        let pruned = before - entries.len();
        if pruned > 0 {
            tracing::debug!(pruned, "pruned metadata for closed pull requests");
        }
        pruned
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    fn small_cache(max_entries: usize) -> BoundedCache<String, String> {
        BoundedCache::new(CacheConfig {
            max_entries,
            ttl: Duration::from_secs(60),
        })
    }

    #[test]
    fn test_get_or_compute_fetches_once() {
        let cache = small_cache(4);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute("acme".to_string(), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("profile".to_string())
                })
                .unwrap();
            assert_eq!(value, "profile");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache = small_cache(4);
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_compute("acme".to_string(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(HostError::transport("down"))
        });
        assert!(first.is_err());

        let second = cache.get_or_compute("acme".to_string(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("profile".to_string())
        });
        assert_eq!(second.unwrap(), "profile");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lru_eviction_beyond_capacity() {
        let cache = small_cache(2);
        cache.get_or_compute("a".to_string(), || Ok("1".to_string())).unwrap();
        cache.get_or_compute("b".to_string(), || Ok("2".to_string())).unwrap();
        // Touch "a" so "b" becomes the least recently used.
        assert_eq!(cache.get(&"a".to_string()), Some("1".to_string()));

        cache.get_or_compute("c".to_string(), || Ok("3".to_string())).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some("1".to_string()));
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.get(&"c".to_string()), Some("3".to_string()));
    }

    #[test]
    fn test_expired_entry_triggers_exactly_one_refetch() {
        let cache: BoundedCache<String, String> = BoundedCache::new(CacheConfig {
            max_entries: 4,
            ttl: Duration::from_millis(50),
        });
        let calls = AtomicUsize::new(0);

        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("v".to_string())
        };
        cache.get_or_compute("k".to_string(), fetch).unwrap();
        thread::sleep(Duration::from_millis(80));

        let fetch_again = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("v2".to_string())
        };
        let value = cache.get_or_compute("k".to_string(), fetch_again).unwrap();
        assert_eq!(value, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Fresh again: no third fetch.
        cache
            .get_or_compute("k".to_string(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("v3".to_string())
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_callers_share_one_fetch() {
        let cache = Arc::new(small_cache(4));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache
                        .get_or_compute("acme".to_string(), move || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            // Hold the in-flight window open long enough for
                            // the other threads to pile up behind it.
                            thread::sleep(Duration::from_millis(30));
                            Ok("profile".to_string())
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "profile");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pr_metadata_prune_against_live_set() {
        let cache = PrMetadataCache::new();
        cache.insert(
            7,
            PrMetadata {
                title: "improve widget".to_string(),
                author: "someone".to_string(),
            },
        );
        cache.insert(
            8,
            PrMetadata {
                title: "other".to_string(),
                author: "else".to_string(),
            },
        );

        let live = BTreeSet::from([8]);
        let pruned = cache.retain_live(&live);
        assert_eq!(pruned, 1);
        assert!(cache.get(7).is_none());
        assert!(cache.get(8).is_some());
    }
}
