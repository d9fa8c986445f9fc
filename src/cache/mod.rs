//! Cache Module
//!
//! Two tiers behind one facade: Redis when it answers, a bounded in-process
//! TTL store when it does not.

pub mod aside;
mod entry;
mod memory;
mod options;
mod pattern;
mod remote;
mod service;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use memory::{MemoryCache, MemoryConfig};
pub use options::{build_key, CacheOptions};
pub use pattern::GlobPattern;
pub use remote::{RemoteBackend, RemoteCache, RemoteConfig};
pub use service::{CacheService, FallbackMetrics, FallbackSnapshot};
pub use stats::{CacheStats, StoreCounters};
pub use store::MemoryStore;
