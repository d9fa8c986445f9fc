//! Cache Service Module
//!
//! The single cache entry point for the rest of the application. Every call
//! tries the remote tier first and falls back to the in-process store for
//! that call alone when the remote tier errors or is not configured.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheOptions, CacheStats, MemoryCache, MemoryConfig, RemoteBackend};
use crate::error::{CacheError, Result};

// == Fallback Metrics ==
/// Counters that make a degraded remote tier visible to operators.
#[derive(Debug, Default)]
pub struct FallbackMetrics {
    remote_failures: AtomicU64,
    fallback_operations: AtomicU64,
    local_initializations: AtomicU64,
}

impl FallbackMetrics {
    fn record_remote_failure(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_fallback(&self) {
        self.fallback_operations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_local_init(&self) {
        self.local_initializations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FallbackSnapshot {
        FallbackSnapshot {
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
            fallback_operations: self.fallback_operations.load(Ordering::Relaxed),
            local_initializations: self.local_initializations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FallbackMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FallbackSnapshot {
    /// Remote calls that returned an error (including failed flushes)
    pub remote_failures: u64,
    /// Calls answered by the in-process store after a remote failure
    pub fallback_operations: u64,
    /// Times the in-process store was created; never exceeds 1
    pub local_initializations: u64,
}

// == Cache Service ==
/// Remote-first cache with lazy in-process fallback.
pub struct CacheService {
    remote: Option<Arc<dyn RemoteBackend>>,
    local: OnceLock<MemoryCache>,
    memory_config: MemoryConfig,
    metrics: FallbackMetrics,
}

impl CacheService {
    /// Creates a facade over an optional remote tier. The in-process store is
    /// only built the first time it is needed.
    pub fn new(remote: Option<Arc<dyn RemoteBackend>>, memory_config: MemoryConfig) -> Self {
        Self {
            remote,
            local: OnceLock::new(),
            memory_config,
            metrics: FallbackMetrics::default(),
        }
    }

    /// A facade with no remote tier; every call goes to the in-process store.
    pub fn local_only(memory_config: MemoryConfig) -> Self {
        Self::new(None, memory_config)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// True once the in-process store has been created.
    pub fn local_initialized(&self) -> bool {
        self.local.get().is_some()
    }

    pub fn metrics(&self) -> FallbackSnapshot {
        self.metrics.snapshot()
    }

    // == Set ==
    /// Stores a value. A value that cannot be represented as JSON is dropped.
    pub async fn set<T>(&self, key: &str, value: &T, options: &CacheOptions)
    where
        T: Serialize + ?Sized,
    {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "Value not serializable; skipping cache write");
                return;
            }
        };

        if let Some(remote) = &self.remote {
            match remote.set(key, &value, options).await {
                Ok(()) => return,
                Err(err) => self.note_fallback("set", &err),
            }
        }
        self.local().set(key, value, options).await;
    }

    // == Get ==
    /// Returns the cached value, or None on a miss or if the stored value
    /// does not deserialize into `T`.
    pub async fn get<T>(&self, key: &str, options: &CacheOptions) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let value = self.get_value(key, options).await?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key, error = %err, "Cached value has unexpected shape; treating as miss");
                None
            }
        }
    }

    async fn get_value(&self, key: &str, options: &CacheOptions) -> Option<Value> {
        if let Some(remote) = &self.remote {
            match remote.get(key, options).await {
                Ok(value) => return value,
                Err(err) => self.note_fallback("get", &err),
            }
        }
        self.local().get(key, options).await
    }

    // == Delete ==
    pub async fn delete(&self, key: &str, options: &CacheOptions) -> bool {
        if let Some(remote) = &self.remote {
            match remote.delete(key, options).await {
                Ok(removed) => return removed,
                Err(err) => self.note_fallback("delete", &err),
            }
        }
        self.local().delete(key, options).await
    }

    // == Delete By Pattern ==
    /// Removes every key matching the glob (`*` = any sequence).
    pub async fn delete_by_pattern(&self, pattern: &str) -> usize {
        if let Some(remote) = &self.remote {
            match remote.delete_by_pattern(pattern).await {
                Ok(removed) => return removed,
                Err(err) => self.note_fallback("delete_by_pattern", &err),
            }
        }
        self.local().delete_by_pattern(pattern).await
    }

    // == Exists ==
    pub async fn exists(&self, key: &str, options: &CacheOptions) -> bool {
        if let Some(remote) = &self.remote {
            match remote.exists(key, options).await {
                Ok(found) => return found,
                Err(err) => self.note_fallback("exists", &err),
            }
        }
        self.local().exists(key, options).await
    }

    // == TTL ==
    /// Remaining seconds; -2 if absent, -1 if expired or without expiry.
    pub async fn ttl(&self, key: &str, options: &CacheOptions) -> i64 {
        if let Some(remote) = &self.remote {
            match remote.ttl(key, options).await {
                Ok(ttl) => return ttl,
                Err(err) => self.note_fallback("ttl", &err),
            }
        }
        self.local().ttl(key, options).await
    }

    // == Extend TTL ==
    pub async fn extend_ttl(&self, key: &str, seconds: u64, options: &CacheOptions) -> bool {
        if let Some(remote) = &self.remote {
            match remote.extend_ttl(key, seconds, options).await {
                Ok(extended) => return extended,
                Err(err) => self.note_fallback("extend_ttl", &err),
            }
        }
        self.local().extend_ttl(key, seconds, options).await
    }

    // == Keys ==
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        if let Some(remote) = &self.remote {
            match remote.keys(pattern).await {
                Ok(keys) => return keys,
                Err(err) => self.note_fallback("keys", &err),
            }
        }
        self.local().keys(pattern).await
    }

    // == Flush All ==
    /// Clears the cache.
    ///
    /// With a remote tier, a failed remote flush is returned as an error and
    /// nothing is cleared locally. On success the in-process store (if it
    /// exists) is cleared too, so no stale fallback entries survive.
    pub async fn flush_all(&self) -> Result<()> {
        if let Some(remote) = &self.remote {
            if let Err(err) = remote.flush_all().await {
                self.metrics.record_remote_failure();
                warn!(error = %err, "Remote flush failed");
                return Err(err);
            }
            if let Some(local) = self.local.get() {
                local.flush_all().await;
            }
            return Ok(());
        }
        self.local().flush_all().await;
        Ok(())
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        if let Some(remote) = &self.remote {
            match remote.stats().await {
                Ok(stats) => return stats,
                Err(err) => self.note_fallback("stats", &err),
            }
        }
        self.local().stats().await
    }

    /// Stops the in-process store's sweep, if the store was ever created.
    pub fn shutdown(&self) {
        if let Some(local) = self.local.get() {
            local.shutdown();
        }
    }

    fn local(&self) -> &MemoryCache {
        self.local.get_or_init(|| {
            self.metrics.record_local_init();
            if self.remote.is_some() {
                info!(
                    max_keys = self.memory_config.max_keys,
                    "Remote cache unavailable, using in-process cache as fallback"
                );
            } else {
                info!(
                    max_keys = self.memory_config.max_keys,
                    "No remote cache configured, using in-process cache"
                );
            }
            MemoryCache::new(self.memory_config.clone())
        })
    }

    fn note_fallback(&self, op: &'static str, err: &CacheError) {
        self.metrics.record_remote_failure();
        self.metrics.record_fallback();
        warn!(op, error = %err, "Remote cache call failed; serving from in-process cache");
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("has_remote", &self.has_remote())
            .field("local_initialized", &self.local_initialized())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
