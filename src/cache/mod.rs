//! Item cache.
//!
//! A [`CacheStore`] substrate (in-process LRU or Redis) and the
//! [`ItemCacheCoordinator`] that keeps cached item views consistent with the
//! item store.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"          # or "redis"
//! memory_capacity = 10000
//! # redis_url = "redis://127.0.0.1:6379"
//! # entry_ttl_seconds = 3600
//! ```

mod config;
mod coordinator;
mod keys;
mod lock;
mod redis_store;
mod store;

use std::sync::Arc;

use tracing::{info, warn};

pub use config::{
    CacheBackend, CacheConfig, DEFAULT_MEMORY_CAPACITY, DEFAULT_REDIS_POOL_SIZE,
    DEFAULT_REDIS_TIMEOUT_MS,
};
pub use coordinator::ItemCacheCoordinator;
pub use keys::item_key;
pub use redis_store::RedisCacheStore;
pub use store::{CacheError, CacheStore, MemoryCacheStore};

/// Build the configured substrate.
///
/// An unreachable Redis server is not fatal: the coordinator degrades to
/// store-only reads until it comes back.
pub async fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend {
        CacheBackend::Memory => {
            info!(
                target: "stockroom::cache",
                capacity = config.memory_capacity_non_zero().get(),
                "Using in-memory cache substrate"
            );
            Ok(Arc::new(MemoryCacheStore::new(config)))
        }
        CacheBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                CacheError::Unavailable("cache.redis_url is required for the redis backend".into())
            })?;
            let store = RedisCacheStore::connect(url, config)?;
            match store.ping().await {
                Ok(()) => info!(target: "stockroom::cache", "Connected to redis cache substrate"),
                Err(err) => warn!(
                    target: "stockroom::cache",
                    error = %err,
                    "Redis cache substrate unreachable at startup; serving from the store until it recovers"
                ),
            }
            Ok(Arc::new(store))
        }
    }
}
