//! Memory Cache Module
//!
//! Async handle over a shared [`MemoryStore`] that owns the periodic sweep.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheOptions, CacheStats, MemoryStore, StoreCounters};
use crate::tasks::spawn_cleanup_task;

// == Memory Config ==
/// Settings for the in-process store.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of entries
    pub max_keys: usize,
    /// Default TTL in seconds
    pub default_ttl: u64,
    /// Interval between expiry sweeps
    pub cleanup_interval: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_keys: 1000,
            default_ttl: 3600,
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

// == Memory Cache ==
/// Bounded TTL store with a background expiry sweep.
///
/// Must be created inside a Tokio runtime. The sweep stops when the cache is
/// dropped or [`MemoryCache::shutdown`] is called.
#[derive(Debug)]
pub struct MemoryCache {
    store: Arc<RwLock<MemoryStore>>,
    cleanup: JoinHandle<()>,
}

impl MemoryCache {
    pub fn new(config: MemoryConfig) -> Self {
        let store = Arc::new(RwLock::new(MemoryStore::new(
            config.max_keys,
            config.default_ttl,
        )));
        let cleanup = spawn_cleanup_task(store.clone(), config.cleanup_interval);

        Self { store, cleanup }
    }

    pub async fn set(&self, key: &str, value: Value, options: &CacheOptions) {
        self.store.write().await.set(key, value, options);
    }

    pub async fn get(&self, key: &str, options: &CacheOptions) -> Option<Value> {
        self.store.write().await.get(key, options)
    }

    pub async fn delete(&self, key: &str, options: &CacheOptions) -> bool {
        self.store.write().await.delete(key, options)
    }

    pub async fn delete_by_pattern(&self, pattern: &str) -> usize {
        self.store.write().await.delete_by_pattern(pattern)
    }

    pub async fn exists(&self, key: &str, options: &CacheOptions) -> bool {
        self.store.write().await.exists(key, options)
    }

    pub async fn ttl(&self, key: &str, options: &CacheOptions) -> i64 {
        self.store.read().await.ttl(key, options)
    }

    pub async fn extend_ttl(&self, key: &str, seconds: u64, options: &CacheOptions) -> bool {
        self.store.write().await.extend_ttl(key, seconds, options)
    }

    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        self.store.read().await.keys(pattern)
    }

    pub async fn flush_all(&self) {
        self.store.write().await.flush_all();
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn counters(&self) -> StoreCounters {
        self.store.read().await.counters()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Stops the background sweep. Stored entries remain readable.
    pub fn shutdown(&self) {
        if !self.cleanup.is_finished() {
            self.cleanup.abort();
            debug!("Memory cache sweep stopped");
        }
    }

    pub fn is_sweeping(&self) -> bool {
        !self.cleanup.is_finished()
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        self.cleanup.abort();
    }
}
