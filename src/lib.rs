//! Tiered Cache - Redis-backed caching with an in-process fallback
//!
//! Every call goes to Redis first; when Redis is unreachable the same call is
//! served by a bounded in-process TTL store. Includes axum middleware for
//! caching JSON responses and an admin HTTP API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheOptions, CacheService};
pub use config::Config;
pub use error::{CacheError, Result};
