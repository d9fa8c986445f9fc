//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with absolute expiry.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

/// Rough per-entry bookkeeping cost (map slot, timestamps, allocations).
const ENTRY_OVERHEAD_BYTES: usize = 64;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_seconds` from now.
    pub fn new(value: Value, ttl_seconds: u64) -> Self {
        let now = current_timestamp_ms();

        Self {
            value,
            expires_at: deadline_after(now, ttl_seconds),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is still live at exactly `expires_at` and expired one
    /// millisecond later.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    // == Extend ==
    /// Resets the expiry to `seconds` from now.
    pub fn extend(&mut self, seconds: u64) {
        self.expires_at = deadline_after(current_timestamp_ms(), seconds);
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }

    /// Remaining TTL in whole seconds, rounded up, or -1 if nothing remains.
    pub fn ttl_seconds(&self) -> i64 {
        let remaining_ms = self.ttl_remaining_ms();
        if remaining_ms == 0 {
            -1
        } else {
            remaining_ms.div_ceil(1000) as i64
        }
    }

    /// Best-effort size of the entry in bytes.
    pub fn approximate_size(&self, key: &str) -> usize {
        let value_len = serde_json::to_vec(&self.value)
            .map(|bytes| bytes.len())
            .unwrap_or(0);
        key.len() + value_len + ENTRY_OVERHEAD_BYTES
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

fn deadline_after(now_ms: u64, seconds: u64) -> u64 {
    now_ms.saturating_add(seconds.saturating_mul(1000))
}
