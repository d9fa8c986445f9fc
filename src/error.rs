//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
///
/// Only the remote tier and the admin API produce these. The facade absorbs
/// every variant except a failed remote flush.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Could not reach or authenticate against the remote backend
    #[error("Connection error: {0}")]
    Connection(String),

    /// A remote command or connection attempt exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The remote backend rejected a command
    #[error("Backend error: {0}")]
    Backend(String),

    /// Value could not be converted to or from the wire format
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// True when the error means the connection itself is unusable.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, CacheError::Connection(_) | CacheError::Timeout(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CacheError::Timeout(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::Connection(_) | CacheError::Timeout(_) | CacheError::Backend(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (CacheError::NotFound("key".to_string()), StatusCode::NOT_FOUND),
            (CacheError::InvalidRequest("bad".to_string()), StatusCode::BAD_REQUEST),
            (CacheError::Connection("refused".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::Timeout("5s".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::Backend("ERR".to_string()), StatusCode::SERVICE_UNAVAILABLE),
            (CacheError::Internal("error".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.into_response().status(), expected_status);
        }
    }

    #[test]
    fn test_connection_level_classification() {
        assert!(CacheError::Connection("x".into()).is_connection_level());
        assert!(CacheError::Timeout("x".into()).is_connection_level());
        assert!(!CacheError::Backend("x".into()).is_connection_level());
        assert!(!CacheError::NotFound("x".into()).is_connection_level());
    }
}
