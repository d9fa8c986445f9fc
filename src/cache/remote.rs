//! Remote Cache Module
//!
//! Redis tier. Each call gets exactly one attempt: no retries, no queueing
//! while disconnected, and every command is bounded by a timeout. A
//! connection-level failure drops the connection; the next call reconnects.
//!
//! Errors are returned, not swallowed. Deciding to fall back to the
//! in-process store is the facade's job.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheOptions, CacheStats};
use crate::error::{CacheError, Result};

// == Remote Backend ==
/// Operation set of a networked cache tier.
///
/// A plain miss is `Ok` (`None`, `false`, `-2`, empty). `Err` means the tier
/// could not answer.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn set(&self, key: &str, value: &Value, options: &CacheOptions) -> Result<()>;
    async fn get(&self, key: &str, options: &CacheOptions) -> Result<Option<Value>>;
    async fn delete(&self, key: &str, options: &CacheOptions) -> Result<bool>;
    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize>;
    async fn exists(&self, key: &str, options: &CacheOptions) -> Result<bool>;
    async fn ttl(&self, key: &str, options: &CacheOptions) -> Result<i64>;
    async fn extend_ttl(&self, key: &str, seconds: u64, options: &CacheOptions) -> Result<bool>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
    async fn flush_all(&self) -> Result<()>;
    async fn stats(&self) -> Result<CacheStats>;
}

// == Remote Config ==
/// Connection and sizing settings for the Redis tier.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    /// Default TTL in seconds
    pub default_ttl: u64,
    /// Key ceiling enforced before each write
    pub max_keys: usize,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
            default_ttl: 3600,
            max_keys: 100,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(5),
        }
    }
}

impl RemoteConfig {
    /// Builds the connection URL, percent-encoding the password.
    pub fn connection_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("redis://{}:{}/{}", self.host, self.port, self.db))
            .map_err(|e| CacheError::InvalidRequest(format!("Invalid Redis endpoint: {}", e)))?;

        if let Some(password) = &self.password {
            url.set_password(Some(password)).map_err(|_| {
                CacheError::InvalidRequest("Redis URL cannot carry a password".to_string())
            })?;
        }
        Ok(url)
    }

    /// `host:port`, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// == Remote Cache ==
/// Redis-backed [`RemoteBackend`].
pub struct RemoteCache {
    client: Client,
    /// Current connection; None until first use or after a connection-level error
    connection: RwLock<Option<MultiplexedConnection>>,
    /// Held by the one caller currently dialing
    connecting: Mutex<()>,
    config: RemoteConfig,
}

impl RemoteCache {
    /// Validates the configuration. No connection is made until the first call.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let url = config.connection_url()?;
        let client = Client::open(url.as_str()).map_err(|e| {
            CacheError::Connection(format!("Invalid Redis config for {}: {}", config.endpoint(), e))
        })?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            connecting: Mutex::new(()),
            config,
        })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Round-trips a PING, connecting if needed.
    pub async fn ping(&self) -> Result<()> {
        let _pong: String = self
            .run("ping", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    /// Drops the current connection without scheduling a reconnect.
    pub async fn disconnect(&self) {
        if self.connection.write().await.take().is_some() {
            info!(endpoint = %self.config.endpoint(), "Redis connection closed");
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        // One dial at a time; other callers fail fast instead of waiting on it.
        let Ok(_dialing) = self.connecting.try_lock() else {
            return Err(CacheError::Connection(format!(
                "Connection to {} already in progress",
                self.config.endpoint()
            )));
        };
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let conn = tokio::time::timeout(
            self.config.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "Connecting to {} exceeded {:?}",
                self.config.endpoint(),
                self.config.connect_timeout
            ))
        })??;

        info!(endpoint = %self.config.endpoint(), "Redis connected");
        *self.connection.write().await = Some(conn.clone());
        Ok(conn)
    }

    /// Runs one command under the command timeout. Connection-level failures
    /// drop the connection.
    async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = match self.connection().await {
            Ok(conn) => conn,
            Err(err) => {
                debug!(op, endpoint = %self.config.endpoint(), error = %err, "Redis not connected");
                return Err(err);
            }
        };

        let outcome = match tokio::time::timeout(self.config.command_timeout, command(conn)).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(format!(
                "{} exceeded {:?}",
                op, self.config.command_timeout
            ))),
        };

        if let Err(err) = &outcome {
            if err.is_connection_level() {
                warn!(op, endpoint = %self.config.endpoint(), error = %err, "Redis unavailable");
                self.disconnect().await;
            }
        }
        outcome
    }

    /// Evicts the soonest-expiring tenth of the ceiling when the server is full.
    ///
    /// Only connection-level failures are reported; anything else is ignored
    /// so the write can still go ahead.
    async fn enforce_key_limit(&self) -> Result<()> {
        match self.try_enforce_key_limit().await {
            Err(err) if err.is_connection_level() => Err(err),
            Err(err) => {
                debug!(error = %err, "Redis key limit check skipped");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    async fn try_enforce_key_limit(&self) -> Result<()> {
        let size: usize = self
            .run("dbsize", |mut conn| async move {
                redis::cmd("DBSIZE").query_async(&mut conn).await
            })
            .await?;
        if size < self.config.max_keys {
            return Ok(());
        }

        let keys: Vec<String> = self
            .run("keys", |mut conn| async move { conn.keys::<_, Vec<String>>("*").await })
            .await?;
        if keys.is_empty() {
            return Ok(());
        }

        let ttls: Vec<i64> = {
            let mut pipe = redis::pipe();
            for key in &keys {
                pipe.ttl(key);
            }
            self.run("ttl", |mut conn| async move { pipe.query_async(&mut conn).await })
                .await?
        };

        let victims = eviction_victims(keys.into_iter().zip(ttls).collect(), self.config.max_keys);

        let removed: usize = self
            .run("del", |mut conn| async move { conn.del::<_, usize>(&victims).await })
            .await?;
        debug!(removed, size, max_keys = self.config.max_keys, "Redis key limit enforced");
        Ok(())
    }
}

#[async_trait]
impl RemoteBackend for RemoteCache {
    async fn set(&self, key: &str, value: &Value, options: &CacheOptions) -> Result<()> {
        let cache_key = options.key_for(key);
        let ttl = options.ttl_or(self.config.default_ttl);
        let payload = serde_json::to_string(value)?;

        self.enforce_key_limit().await?;

        self.run("set", |mut conn| async move {
            conn.set_ex::<_, _, ()>(&cache_key, payload, ttl).await
        })
        .await
    }

    async fn get(&self, key: &str, options: &CacheOptions) -> Result<Option<Value>> {
        let cache_key = options.key_for(key);
        let raw: Option<String> = self
            .run("get", |mut conn| {
                let cache_key = cache_key.clone();
                async move { conn.get::<_, Option<String>>(&cache_key).await }
            })
            .await?;

        Ok(raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key = %cache_key, error = %err, "Stored value is not JSON; treating as miss");
                None
            }
        }))
    }

    async fn delete(&self, key: &str, options: &CacheOptions) -> Result<bool> {
        let cache_key = options.key_for(key);
        let removed: usize = self
            .run("del", |mut conn| async move { conn.del::<_, usize>(&cache_key).await })
            .await?;
        Ok(removed > 0)
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        let keys = self.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        self.run("del", |mut conn| async move { conn.del::<_, usize>(&keys).await })
            .await
    }

    async fn exists(&self, key: &str, options: &CacheOptions) -> Result<bool> {
        let cache_key = options.key_for(key);
        self.run("exists", |mut conn| async move {
            conn.exists::<_, bool>(&cache_key).await
        })
        .await
    }

    async fn ttl(&self, key: &str, options: &CacheOptions) -> Result<i64> {
        let cache_key = options.key_for(key);
        self.run("ttl", |mut conn| async move { conn.ttl::<_, i64>(&cache_key).await })
            .await
    }

    async fn extend_ttl(&self, key: &str, seconds: u64, options: &CacheOptions) -> Result<bool> {
        let cache_key = options.key_for(key);
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        self.run("expire", |mut conn| async move {
            conn.expire::<_, bool>(&cache_key, seconds).await
        })
        .await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let glob = to_redis_glob(pattern);
        self.run("keys", |mut conn| async move {
            conn.keys::<_, Vec<String>>(&glob).await
        })
        .await
    }

    async fn flush_all(&self) -> Result<()> {
        self.run("flushall", |mut conn| async move {
            redis::cmd("FLUSHALL").query_async(&mut conn).await
        })
        .await
    }

    async fn stats(&self) -> Result<CacheStats> {
        let info: String = self
            .run("info", |mut conn| async move {
                redis::cmd("INFO").query_async(&mut conn).await
            })
            .await?;
        let total_keys: usize = self
            .run("dbsize", |mut conn| async move {
                redis::cmd("DBSIZE").query_async(&mut conn).await
            })
            .await?;

        Ok(CacheStats {
            total_keys,
            memory_usage: info_field(&info, "used_memory_human")
                .unwrap_or("Unknown")
                .to_string(),
            connected_clients: info_field(&info, "connected_clients")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        })
    }
}

/// Picks the keys to drop when the server is at its ceiling: the lowest
/// TTL replies first, a tenth of `max_keys` (rounded up, at least one).
///
/// TTL replies are compared as-is, so `-1` (no expiry) sorts ahead of any
/// key with time left.
fn eviction_victims(mut keys_with_ttl: Vec<(String, i64)>, max_keys: usize) -> Vec<String> {
    keys_with_ttl.sort_by_key(|(_, ttl)| *ttl);

    let batch = max_keys.max(1).div_ceil(10);
    keys_with_ttl
        .into_iter()
        .take(batch)
        .map(|(key, _)| key)
        .collect()
}

/// Escapes Redis glob metacharacters other than `*`, so every other
/// character matches literally.
fn to_redis_glob(pattern: &str) -> String {
    let mut glob = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '?' | '[' | ']' | '\\' | '^') {
            glob.push('\\');
        }
        glob.push(c);
    }
    glob
}

/// Reads `field:value` from an INFO reply.
fn info_field<'a>(info: &'a str, field: &str) -> Option<&'a str> {
    info.lines().find_map(|line| {
        line.strip_prefix(field)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}
