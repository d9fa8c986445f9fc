//! Per-call cache options and key composition.

use serde::Deserialize;

// == Cache Options ==
/// Options carried by each cache call.
///
/// `ttl` falls back to the tier's configured default when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CacheOptions {
    /// TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Namespace prepended as `prefix:key`
    #[serde(default)]
    pub prefix: Option<String>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Returns the stored key for `key` under these options.
    pub fn key_for(&self, key: &str) -> String {
        build_key(key, self.prefix.as_deref())
    }

    /// Effective TTL in seconds. Zero counts as unset.
    pub fn ttl_or(&self, default_ttl: u64) -> u64 {
        self.ttl.filter(|ttl| *ttl > 0).unwrap_or(default_ttl)
    }
}

/// Composes `prefix:key`, or the bare key when no prefix (or an empty one) is given.
pub fn build_key(key: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, key),
        _ => key.to_string(),
    }
}
