//! Generic LRU Cache
//!
//! Bounded key-value cache with optional per-entry TTL, backed by a
//! `HashMap` index over an intrusive doubly-linked list so that `get` can
//! move an entry to the front in O(1). Every operation locks an internal
//! `parking_lot::Mutex`, so the cache is safe to share behind an `Arc`
//! across tasks without an external lock.
//!
//! `max_entries == 0` disables eviction; `ttl.is_zero()` disables expiry.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Slot<K, V> {
    key: K,
    value: V,
    expiry: Option<Instant>,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Inner<K, V> {
    slots: Vec<Option<Slot<K, V>>>,
    index: HashMap<K, usize>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

/// Snapshot of cache hit/miss/eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expiries: u64,
    pub evictions: u64,
}

/// A bounded, optionally TTL-expiring LRU cache.
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    stats: Mutex<CacheStats>,
    max_entries: usize,
    ttl: Duration,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn unlink(&mut self, id: usize) {
        let (prev, next) = {
            let slot = self.slots[id].as_ref().expect("unlink of vacant slot");
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, id: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[id].as_mut().unwrap();
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h].as_mut().unwrap().prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
    }

    fn touch(&mut self, id: usize) {
        if self.head == Some(id) {
            return;
        }
        self.unlink(id);
        self.push_front(id);
    }

    fn remove_slot(&mut self, id: usize) -> Slot<K, V> {
        self.unlink(id);
        let slot = self.slots[id].take().expect("remove of vacant slot");
        self.index.remove(&slot.key);
        self.free.push(id);
        self.len -= 1;
        slot
    }

    fn insert_new(&mut self, key: K, value: V, expiry: Option<Instant>) -> usize {
        let slot = Slot {
            key: key.clone(),
            value,
            expiry,
            prev: None,
            next: None,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(slot);
                id
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, id);
        self.push_front(id);
        self.len += 1;
        id
    }
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with the given bound (`0` = unbounded) and TTL
    /// (`Duration::ZERO` = entries never expire).
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            stats: Mutex::new(CacheStats::default()),
            max_entries,
            ttl,
        }
    }

    fn expiry_for(&self, now: Instant) -> Option<Instant> {
        if self.ttl.is_zero() {
            None
        } else {
            Some(now + self.ttl)
        }
    }

    /// Insert or overwrite `key`. Resets the TTL and moves the entry to
    /// the front. Evicts the tail entry if this insert would exceed
    /// `max_entries`.
    pub fn set(&self, key: K, value: V) {
        let now = Instant::now();
        let expiry = self.expiry_for(now);
        self.set_with_expiry(key, value, expiry);
    }

    /// Like [`set`](Self::set), but with an explicit expiry instant
    /// (used to restore entries from a persisted snapshot).
    pub fn set_with_expiry(&self, key: K, value: V, expiry: Option<Instant>) {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.index.get(&key) {
            {
                let slot = inner.slots[id].as_mut().unwrap();
                slot.value = value;
                slot.expiry = expiry;
            }
            inner.touch(id);
            return;
        }

        if self.max_entries > 0 && inner.len >= self.max_entries {
            if let Some(tail) = inner.tail {
                inner.remove_slot(tail);
                self.stats.lock().evictions += 1;
            }
        }
        inner.insert_new(key, value, expiry);
    }

    /// Look up `key`. A TTL-expired entry is evicted and counted as both
    /// an expiry and a miss. On hit, the entry moves to the front.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let Some(&id) = inner.index.get(key) else {
            self.stats.lock().misses += 1;
            return None;
        };

        let expired = inner.slots[id]
            .as_ref()
            .unwrap()
            .expiry
            .is_some_and(|exp| Instant::now() > exp);

        if expired {
            inner.remove_slot(id);
            let mut stats = self.stats.lock();
            stats.expiries += 1;
            stats.misses += 1;
            return None;
        }

        inner.touch(id);
        let value = inner.slots[id].as_ref().unwrap().value.clone();
        self.stats.lock().hits += 1;
        Some(value)
    }

    /// Remove `key` unconditionally. Returns whether it was present.
    pub fn delete(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.index.get(key) {
            inner.remove_slot(id);
            true
        } else {
            false
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        *inner = Inner::new();
    }

    /// Number of live (not necessarily unexpired) entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from most- to least-recently-used.
    pub fn keys(&self) -> Vec<K> {
        let inner = self.inner.lock();
        let mut out = Vec::with_capacity(inner.len);
        let mut cur = inner.head;
        while let Some(id) = cur {
            let slot = inner.slots[id].as_ref().unwrap();
            out.push(slot.key.clone());
            cur = slot.next;
        }
        out
    }

    /// Walk tail-to-head evicting expired entries. Returns the count
    /// removed. No-op when the cache has no TTL configured.
    pub fn cleanup(&self) -> usize {
        if self.ttl.is_zero() {
            return 0;
        }
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let mut removed = 0usize;
        let mut cur = inner.tail;
        while let Some(id) = cur {
            let prev = inner.slots[id].as_ref().unwrap().prev;
            let expired = inner.slots[id]
                .as_ref()
                .unwrap()
                .expiry
                .is_some_and(|exp| now > exp);
            if expired {
                inner.remove_slot(id);
                removed += 1;
            }
            cur = prev;
        }
        if removed > 0 {
            self.stats.lock().expiries += removed as u64;
        }
        removed
    }

    /// Snapshot of all non-expired entries, most-recently-used first.
    /// Used by callers that persist the cache to disk.
    pub fn entries(&self) -> Vec<(K, V, Option<Instant>)> {
        let now = Instant::now();
        let inner = self.inner.lock();
        let mut out = Vec::with_capacity(inner.len);
        let mut cur = inner.head;
        while let Some(id) = cur {
            let slot = inner.slots[id].as_ref().unwrap();
            if !slot.expiry.is_some_and(|exp| now > exp) {
                out.push((slot.key.clone(), slot.value.clone(), slot.expiry));
            }
            cur = slot.next;
        }
        out
    }

    /// Snapshot of hit/miss/expiry/eviction counters.
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let cache = LruCache::new(0, Duration::ZERO);
        cache.set("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
    }

    #[test]
    fn eviction_respects_max_entries() {
        let cache = LruCache::new(2, Duration::ZERO);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn get_promotes_survivor_past_eviction() {
        let cache = LruCache::new(2, Duration::ZERO);
        cache.set("a", 1);
        cache.set("b", 2);
        // touch "a" so "b" becomes the LRU victim
        cache.get(&"a");
        cache.set("c", 3);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn size_after_n_sets_with_distinct_keys() {
        let cache = LruCache::new(3, Duration::ZERO);
        for i in 0..10 {
            cache.set(i, i);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn ttl_expires_entries() {
        let cache = LruCache::new(0, Duration::from_millis(10));
        cache.set("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.stats().expiries, 1);
    }

    #[test]
    fn ttl_disabled_when_zero() {
        let cache = LruCache::new(0, Duration::ZERO);
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"a"), Some(1));
    }

    #[test]
    fn cleanup_counts_expired_only() {
        let cache = LruCache::new(0, Duration::from_millis(10));
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(20));
        cache.set("b", 2);
        let removed = cache.cleanup();
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[test]
    fn entries_snapshot_excludes_expired() {
        let cache = LruCache::new(0, Duration::from_millis(10));
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(20));
        cache.set("b", 2);
        let snap = cache.entries();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].0, "b");
    }

    #[test]
    fn set_with_expiry_restores_ttl() {
        let cache: LruCache<&str, i32> = LruCache::new(0, Duration::from_secs(60));
        let past = Instant::now() - Duration::from_secs(1);
        cache.set_with_expiry("a", 1, Some(past));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn delete_and_clear() {
        let cache = LruCache::new(0, Duration::ZERO);
        cache.set("a", 1);
        assert!(cache.delete(&"a"));
        assert!(!cache.delete(&"a"));
        cache.set("b", 2);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn keys_head_to_tail_order() {
        let cache = LruCache::new(0, Duration::ZERO);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        assert_eq!(cache.keys(), vec!["c", "b", "a"]);
    }
}
