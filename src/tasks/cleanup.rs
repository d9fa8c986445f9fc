//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from the
//! in-process store, whether or not anyone reads them again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{MemoryStore, StoreCounters};

/// Spawns a background task that periodically sweeps expired entries.
///
/// The first sweep runs one full `interval` after spawning. Each sweep holds
/// the write lock only for the duration of one pass over the map.
///
/// # Returns
/// A JoinHandle that the owner aborts on teardown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(MemoryStore::new(1000, 3600)));
/// let cleanup_handle = spawn_cleanup_task(store.clone(), Duration::from_secs(300));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(store: Arc<RwLock<MemoryStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting TTL cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let SweepReport {
                removed,
                remaining,
                counters,
            } = sweep(&mut *store.write().await);

            if removed > 0 {
                info!(
                    removed,
                    remaining,
                    hits = counters.hits,
                    misses = counters.misses,
                    evictions = counters.evictions,
                    hit_rate = counters.hit_rate(),
                    "TTL cleanup: removed expired entries"
                );
            } else {
                debug!(
                    remaining,
                    hits = counters.hits,
                    misses = counters.misses,
                    evictions = counters.evictions,
                    "TTL cleanup: no expired entries found"
                );
            }
        }
    })
}

/// What one sweep did, plus the store's counters at that point.
#[derive(Debug)]
struct SweepReport {
    removed: usize,
    remaining: usize,
    counters: StoreCounters,
}

fn sweep(store: &mut MemoryStore) -> SweepReport {
    let removed = store.cleanup_expired();
    SweepReport {
        removed,
        remaining: store.len(),
        counters: store.counters(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use serde_json::json;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let store = Arc::new(RwLock::new(MemoryStore::new(100, 300)));

        store
            .write()
            .await
            .set("expire_soon", json!("value"), &CacheOptions::new().with_ttl(1));

        let handle = spawn_cleanup_task(store.clone(), Duration::from_secs(1));

        // Wait for entry to expire and cleanup to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(store.read().await.len(), 0, "Expired entry should have been swept");

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let store = Arc::new(RwLock::new(MemoryStore::new(100, 300)));

        store
            .write()
            .await
            .set("long_lived", json!("value"), &CacheOptions::new().with_ttl(3600));

        let handle = spawn_cleanup_task(store.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let value = store.write().await.get("long_lived", &CacheOptions::new());
        assert_eq!(value, Some(json!("value")));

        handle.abort();
    }

    #[test]
    fn test_sweep_reports_counters() {
        let mut store = MemoryStore::new(100, 300);
        let opts = CacheOptions::new();
        store.set("a", json!(1), &opts);
        store.get("a", &opts);
        store.get("missing", &opts);

        let report = sweep(&mut store);
        assert_eq!(report.removed, 0);
        assert_eq!(report.remaining, 1);
        assert_eq!(report.counters.hits, 1);
        assert_eq!(report.counters.misses, 1);
        assert_eq!(report.counters.evictions, 0);
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let store = Arc::new(RwLock::new(MemoryStore::new(100, 300)));

        let handle = spawn_cleanup_task(store, Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
