use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded in-memory cache whose entries expire `ttl` after insertion.
///
/// When full, the oldest inserted entry is evicted first. Callers pass `now`
/// explicitly so expiry is deterministic under test.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    max_entries: usize,
    entries: BTreeMap<String, CacheEntry<V>>,
    order: VecDeque<String>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: BTreeMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(e) => now.saturating_duration_since(e.inserted_at) >= self.ttl,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&mut self, key: String, value: V, now: Instant) {
        self.remove(&key);
        self.purge_expired(now);
        while self.entries.len() >= self.max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    fn purge_expired(&mut self, now: Instant) {
        // Insertion order is also expiry order.
        while let Some(front) = self.order.front() {
            let expired = self
                .entries
                .get(front)
                .is_none_or(|e| now.saturating_duration_since(e.inserted_at) >= self.ttl);
            if !expired {
                break;
            }
            if let Some(k) = self.order.pop_front() {
                self.entries.remove(&k);
            }
        }
    }
}

/// Cache key: endpoint prefix plus the parameters as sorted-key JSON.
pub fn cache_key(prefix: &str, params: &serde_json::Value) -> String {
    format!("{prefix}:{params}")
}
