//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{MemoryConfig, RemoteConfig};

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Read once at startup; the facade copies what it needs and never re-reads.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to use the Redis tier at all
    pub redis_enabled: bool,
    /// Redis host
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Redis password, if the server requires AUTH
    pub redis_password: Option<String>,
    /// Redis logical database
    pub redis_db: i64,
    /// Default TTL in seconds for entries without explicit TTL (both tiers)
    pub default_ttl: u64,
    /// Key ceiling for the Redis tier
    pub redis_max_keys: usize,
    /// Redis connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Redis per-command timeout in milliseconds
    pub command_timeout_ms: u64,
    /// Key ceiling for the in-process fallback store
    pub memory_max_keys: usize,
    /// Fallback store sweep interval in seconds
    pub cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_ENABLED` - Use the Redis tier (default: true)
    /// - `REDIS_HOST` / `REDIS_PORT` - Redis endpoint (default: localhost:6379)
    /// - `REDIS_PASSWORD` - Redis password (default: none)
    /// - `REDIS_DB` - Redis database index (default: 0)
    /// - `REDIS_TTL` - Default TTL in seconds (default: 3600)
    /// - `REDIS_MAX` - Redis key ceiling (default: 100)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout (default: 10000)
    /// - `REDIS_COMMAND_TIMEOUT_MS` - Command timeout (default: 5000)
    /// - `MEMORY_CACHE_MAX_KEYS` - Fallback store key ceiling (default: 1000)
    /// - `MEMORY_CACHE_CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_enabled: env_or("REDIS_ENABLED", defaults.redis_enabled),
            redis_host: env::var("REDIS_HOST").unwrap_or(defaults.redis_host),
            redis_port: env_or("REDIS_PORT", defaults.redis_port),
            redis_password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            redis_db: env_or("REDIS_DB", defaults.redis_db),
            default_ttl: env_or("REDIS_TTL", defaults.default_ttl),
            redis_max_keys: env_or("REDIS_MAX", defaults.redis_max_keys),
            connect_timeout_ms: env_or("REDIS_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            command_timeout_ms: env_or("REDIS_COMMAND_TIMEOUT_MS", defaults.command_timeout_ms),
            memory_max_keys: env_or("MEMORY_CACHE_MAX_KEYS", defaults.memory_max_keys),
            cleanup_interval: env_or("MEMORY_CACHE_CLEANUP_INTERVAL", defaults.cleanup_interval),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Remote tier settings, or None when Redis is disabled.
    pub fn remote_config(&self) -> Option<RemoteConfig> {
        if !self.redis_enabled {
            return None;
        }
        Some(RemoteConfig {
            host: self.redis_host.clone(),
            port: self.redis_port,
            password: self.redis_password.clone(),
            db: self.redis_db,
            default_ttl: self.default_ttl,
            max_keys: self.redis_max_keys,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            command_timeout: Duration::from_millis(self.command_timeout_ms),
        })
    }

    /// Fallback store settings.
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            max_keys: self.memory_max_keys,
            default_ttl: self.default_ttl,
            cleanup_interval: Duration::from_secs(self.cleanup_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_enabled: true,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_password: None,
            redis_db: 0,
            default_ttl: 3600,
            redis_max_keys: 100,
            connect_timeout_ms: 10_000,
            command_timeout_ms: 5_000,
            memory_max_keys: 1000,
            cleanup_interval: 300,
            server_port: 3000,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
