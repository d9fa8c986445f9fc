//! Response DTOs for the cache admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, FallbackSnapshot};

/// Response body for GET /get/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for PUT /set
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /del/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for GET /ttl/:key and POST /expire/:key
#[derive(Debug, Clone, Serialize)]
pub struct TtlResponse {
    pub key: String,
    /// Seconds remaining; -2 absent, -1 expired or no expiry
    pub ttl: i64,
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub pattern: String,
    pub keys: Vec<String>,
}

/// Response body for DELETE /keys
#[derive(Debug, Clone, Serialize)]
pub struct PatternDeleteResponse {
    pub pattern: String,
    pub deleted: usize,
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_keys: usize,
    pub memory_usage: String,
    pub connected_clients: u64,
    /// Remote-failure and fallback counters
    pub fallback: FallbackSnapshot,
}

impl StatsResponse {
    pub fn new(stats: CacheStats, fallback: FallbackSnapshot) -> Self {
        Self {
            total_keys: stats.total_keys,
            memory_usage: stats.memory_usage,
            connected_clients: stats.connected_clients,
            fallback,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Whether a remote tier is configured
    pub remote_configured: bool,
    /// Whether the in-process fallback store has been created
    pub fallback_active: bool,
}

impl HealthResponse {
    pub fn healthy(remote_configured: bool, fallback_active: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            remote_configured,
            fallback_active,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("recipe:1", json!({"title": "Pho"}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "recipe:1");
        assert_eq!(json["value"]["title"], "Pho");
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_stats_response_flattens_backend_stats() {
        let stats = CacheStats {
            total_keys: 4,
            memory_usage: "2MB".to_string(),
            connected_clients: 1,
        };
        let fallback = FallbackSnapshot {
            remote_failures: 3,
            fallback_operations: 3,
            local_initializations: 1,
        };
        let json = serde_json::to_value(StatsResponse::new(stats, fallback)).unwrap();

        assert_eq!(json["total_keys"], 4);
        assert_eq!(json["memory_usage"], "2MB");
        assert_eq!(json["fallback"]["remote_failures"], 3);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(true, false);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("\"remote_configured\":true"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
