//! Time-bounded concurrent caches.
//!
//! [`TtlCache`] is a generic expire-after-write map backed by `dashmap`, so
//! readers of one key never wait on writers of another. The completion
//! layer keys it by (source, typed input) to skip re-walking the tree while a
//! user keeps typing the same token.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default lifetime of a suggestion cache entry.
pub const SUGGESTION_TTL: Duration = Duration::from_secs(10);

/// Sweep expired entries every this many writes.
const PURGE_EVERY: usize = 64;

struct Entry<V> {
    value: V,
    written: Instant,
}

/// Expire-after-write map. Entries older than the TTL are never returned,
/// regardless of how often they are read.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
    writes: AtomicUsize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            writes: AtomicUsize::new(0),
        }
    }

    /// Fresh value for `key`, dropping it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.written.elapsed() < self.ttl => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        let ttl = self.ttl;
        self.entries.remove_if(key, |_, e| e.written.elapsed() >= ttl);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                written: Instant::now(),
            },
        );
        if self.writes.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            self.purge_expired();
        }
    }

    /// Return the cached value or compute, store and return a new one.
    ///
    /// The computation runs without holding any shard lock, so two racing
    /// callers may both compute; the later write wins.
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.written.elapsed() < ttl);
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for completion: who asked and what they had typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputKey<S> {
    pub source: S,
    pub input: Vec<String>,
}

/// Completion cache: input → tree positions reached at the target depth.
pub type SuggestionCache<S, T> = TtlCache<InputKey<S>, Arc<[T]>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn get_returns_fresh_value() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.insert("a", 1);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn reads_do_not_extend_lifetime() {
        let cache = TtlCache::new(Duration::from_millis(60));
        cache.insert("a", 1);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"a"), Some(1));
        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn get_or_insert_with_computes_once_while_fresh() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cache.get_or_insert_with("k", || {
                calls.fetch_add(1, Ordering::SeqCst);
                7
            });
            assert_eq!(v, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn purge_removes_only_expired() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.insert(1, "old");
        thread::sleep(Duration::from_millis(40));
        cache.insert(2, "new");
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some("new"));
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(10)));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.insert((t, i), i);
                        assert_eq!(cache.get(&(t, i)), Some(i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
