//! Cache Statistics Module
//!
//! Backend-level stats reported by both tiers, plus the in-process store's
//! hit/miss/eviction counters.

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Stats as reported by whichever tier answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of keys currently stored
    pub total_keys: usize,
    /// Human-readable memory usage ("12MB", "1.05M", ...)
    pub memory_usage: String,
    /// Clients connected to the backend; always 1 for the in-process store
    pub connected_clients: u64,
}

// == Store Counters ==
/// Tracks in-process store activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreCounters {
    /// Number of successful retrievals
    pub hits: u64,
    /// Number of failed retrievals (key not found or expired)
    pub misses: u64,
    /// Entries removed to make room under the key ceiling
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expired: u64,
}

impl StoreCounters {
    // == Constructor ==
    /// Creates a new StoreCounters with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired += count as u64;
    }
}
