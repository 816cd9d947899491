// src/cache/ttl.rs
// =============================================================================
// A small in-memory cache with per-entry expiry and a size cap.
//
// Behavior:
// - get() returns None for missing or expired keys (expired keys are dropped)
// - set() evicts the oldest-inserted entry when the cache is full, BEFORE
//   inserting, whether or not that entry has expired yet
// - overwriting a key keeps its original insertion slot
//
// The FIFO rule means a fresh, long-lived entry can be pushed out ahead of an
// almost-expired one. Callers never rely on a hit: a miss just costs a request.
//
// Time comes from tokio::time::Instant so tests can fast-forward the clock.
// =============================================================================

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

// One stored value plus its bookkeeping
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    // Insertion sequence number, used for FIFO eviction
    seq: u64,
}

#[derive(Debug)]
struct CacheInner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    // seq -> key, oldest first
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

/// Thread-safe TTL cache with FIFO eviction.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Mutex<CacheInner<K, V>>,
    max_size: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache holding at most `max_size` entries (minimum 1).
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
            }),
            max_size: max_size.max(1),
        }
    }

    /// Returns a clone of the value if it exists and has not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        let expired = match inner.entries.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
            Some(entry) => entry.seq,
            None => return None,
        };

        inner.entries.remove(key);
        inner.order.remove(&expired);
        None
    }

    /// Inserts or overwrites `key`, expiring after `ttl`.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let mut inner = self.inner.lock();

        // Evict first, counting every stored entry (expired ones included)
        if inner.entries.len() >= self.max_size {
            if let Some((_, oldest)) = inner.order.pop_first() {
                inner.entries.remove(&oldest);
            }
        }

        let expires_at = Instant::now() + ttl;

        if let Some(existing) = inner.entries.get_mut(&key) {
            existing.value = value;
            existing.expires_at = expires_at;
            return;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(key, CacheEntry { value, expires_at, seq });
    }

    /// Removes a key, returning whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.remove(key) {
            Some(entry) => {
                inner.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a BTreeMap for the insertion order?
//    - Keys are sorted, so the first key is always the oldest insertion
//    - pop_first() and remove() are both O(log n)
//    - A VecDeque would need a linear scan to drop an expired key
//
// 2. Why parking_lot::Mutex instead of std::sync::Mutex?
//    - lock() returns the guard directly, there is no poisoning Result
//    - The critical sections here never await, so a blocking mutex is fine
//      even when the cache is shared between async tasks
//
// 3. Why do get() and set() take &self and not &mut self?
//    - The mutex provides "interior mutability"
//    - Many tasks can hold an Arc<TtlCache> and still update it
// -----------------------------------------------------------------------------
