//! Middleware Module
//!
//! Axum middleware that puts the cache in front of HTTP handlers.
//!
//! - `response_cache`: serve and store JSON responses for read routes
//! - `invalidate_on_success`: drop cached keys after a successful write

pub mod response_cache;

pub use response_cache::{
    derive_key, invalidate_on_success, response_cache, CacheKey, CachePolicy,
    InvalidationState, ResponseCacheState, X_CACHE_HEADER,
};
