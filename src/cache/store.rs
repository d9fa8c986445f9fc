//! Memory Store Module
//!
//! Bounded key/value map with per-entry expiry and soonest-expiry eviction.
//! This is the fallback of last resort, so no operation here returns an error.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheOptions, CacheStats, GlobPattern, StoreCounters};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// == Memory Store ==
/// In-process cache storage with a key ceiling and TTL expiry.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage, keyed by the composed `prefix:key`
    entries: HashMap<String, CacheEntry>,
    /// Activity counters
    counters: StoreCounters,
    /// Maximum number of entries allowed
    max_keys: usize,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a new store. A ceiling of zero is treated as one.
    pub fn new(max_keys: usize, default_ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            counters: StoreCounters::new(),
            max_keys: max_keys.max(1),
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value, overwriting any entry under the same composed key.
    ///
    /// When a new key arrives at a full store, expired entries are swept first;
    /// if that does not free a slot, the soonest-expiring tenth of the ceiling
    /// is evicted.
    pub fn set(&mut self, key: &str, value: Value, options: &CacheOptions) {
        let cache_key = options.key_for(key);
        let ttl = options.ttl_or(self.default_ttl);

        if !self.entries.contains_key(&cache_key) {
            self.ensure_capacity();
        }

        self.entries.insert(cache_key, CacheEntry::new(value, ttl));
    }

    // == Get ==
    /// Returns the value if present and not expired. Expired entries are
    /// removed on access.
    pub fn get(&mut self, key: &str, options: &CacheOptions) -> Option<Value> {
        let cache_key = options.key_for(key);
        match self.live_entry(&cache_key) {
            Some(entry) => {
                let value = entry.value.clone();
                self.counters.record_hit();
                Some(value)
            }
            None => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry. Returns true iff something was removed.
    pub fn delete(&mut self, key: &str, options: &CacheOptions) -> bool {
        self.entries.remove(&options.key_for(key)).is_some()
    }

    // == Delete By Pattern ==
    /// Removes every key matching the glob and returns how many were removed.
    pub fn delete_by_pattern(&mut self, pattern: &str) -> usize {
        let Some(glob) = GlobPattern::new(pattern) else {
            return 0;
        };

        let before = self.entries.len();
        self.entries.retain(|key, _| !glob.matches(key));
        before - self.entries.len()
    }

    // == Exists ==
    /// Same expiry semantics as `get`, without cloning the value.
    pub fn exists(&mut self, key: &str, options: &CacheOptions) -> bool {
        self.live_entry(&options.key_for(key)).is_some()
    }

    // == TTL ==
    /// Remaining seconds (rounded up), -2 if absent, -1 if expired at read time.
    pub fn ttl(&self, key: &str, options: &CacheOptions) -> i64 {
        match self.entries.get(&options.key_for(key)) {
            Some(entry) => entry.ttl_seconds(),
            None => -2,
        }
    }

    // == Extend TTL ==
    /// Resets the entry's expiry to `seconds` from now. False if absent.
    pub fn extend_ttl(&mut self, key: &str, seconds: u64, options: &CacheOptions) -> bool {
        match self.entries.get_mut(&options.key_for(key)) {
            Some(entry) => {
                entry.extend(seconds);
                true
            }
            None => false,
        }
    }

    // == Keys ==
    /// Lists live keys matching the glob without modifying the store.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let Some(glob) = GlobPattern::new(pattern) else {
            return Vec::new();
        };

        self.entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && glob.matches(key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Flush All ==
    pub fn flush_all(&mut self) {
        self.entries.clear();
    }

    // == Stats ==
    /// Backend-style stats. Memory usage is an estimate of the map's footprint.
    pub fn stats(&self) -> CacheStats {
        let bytes: usize = self
            .entries
            .iter()
            .map(|(key, entry)| entry.approximate_size(key))
            .sum();

        CacheStats {
            total_keys: self.entries.len(),
            memory_usage: format!("{}MB", (bytes as f64 / BYTES_PER_MB).round() as u64),
            connected_clients: 1,
        }
    }

    /// Activity counters since creation.
    pub fn counters(&self) -> StoreCounters {
        self.counters.clone()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));

        let removed = before - self.entries.len();
        self.counters.record_expired(removed);
        removed
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Looks up an entry, dropping it if it has expired.
    fn live_entry(&mut self, cache_key: &str) -> Option<&CacheEntry> {
        let expired = self.entries.get(cache_key)?.is_expired();
        if expired {
            self.entries.remove(cache_key);
            self.counters.record_expired(1);
            return None;
        }
        self.entries.get(cache_key)
    }

    fn ensure_capacity(&mut self) {
        if self.entries.len() < self.max_keys {
            return;
        }

        self.cleanup_expired();
        if self.entries.len() < self.max_keys {
            return;
        }

        let batch = self.max_keys.div_ceil(10);
        let mut by_expiry: Vec<(&String, u64)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key, entry.expires_at))
            .collect();
        by_expiry.sort_by_key(|(_, expires_at)| *expires_at);

        let victims: Vec<String> = by_expiry
            .into_iter()
            .take(batch)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &victims {
            self.entries.remove(key);
        }
        self.counters.record_evictions(victims.len());
    }
}
