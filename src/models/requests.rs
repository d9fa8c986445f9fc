//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::CacheOptions;

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Optional key namespace
    #[serde(default)]
    pub prefix: Option<String>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }

    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            ttl: self.ttl,
            prefix: self.prefix.clone(),
        }
    }
}

/// Request body for POST /expire/:key
#[derive(Debug, Clone, Deserialize)]
pub struct ExpireRequest {
    /// New TTL in seconds, counted from now
    pub seconds: u64,
    #[serde(default)]
    pub prefix: Option<String>,
}

impl ExpireRequest {
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            ttl: None,
            prefix: self.prefix.clone(),
        }
    }
}

/// `?prefix=` on key-addressed endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefixQuery {
    #[serde(default)]
    pub prefix: Option<String>,
}

impl PrefixQuery {
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            ttl: None,
            prefix: self.prefix.clone(),
        }
    }
}

/// `?pattern=` on /keys; defaults to every key
#[derive(Debug, Clone, Deserialize)]
pub struct PatternQuery {
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_pattern() -> String {
    "*".to_string()
}
