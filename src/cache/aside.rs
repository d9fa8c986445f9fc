//! Cache-aside helpers for service code that is not behind the HTTP middleware.
//!
//! ```ignore
//! let recipe = get_or_compute(&cache, &id, &opts, || repo.find_recipe(&id)).await?;
//!
//! evict_after(&cache, &["api:/recipes*"], repo.update_recipe(&id, patch)).await?;
//! ```

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheOptions, CacheService};

/// Returns the cached value under `key`, or runs `compute`, caches its
/// `Ok` result and returns it. Errors from `compute` are returned uncached.
pub async fn get_or_compute<T, E, F, Fut>(
    cache: &CacheService,
    key: &str,
    options: &CacheOptions,
    compute: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(hit) = cache.get::<T>(key, options).await {
        debug!(key, "cache-aside hit");
        return Ok(hit);
    }

    let value = compute().await?;
    cache.set(key, &value, options).await;
    Ok(value)
}

/// Awaits a mutating operation and, if it succeeds, deletes every key
/// matching each pattern. A failed operation leaves the cache untouched.
pub async fn evict_after<T, E, Fut>(
    cache: &CacheService,
    patterns: &[&str],
    operation: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let outcome = operation.await?;
    for pattern in patterns {
        let removed = cache.delete_by_pattern(pattern).await;
        debug!(pattern, removed, "evicted after write");
    }
    Ok(outcome)
}
