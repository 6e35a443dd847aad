//! Cache substrate configuration.
//!
//! Selected via the `[cache]` table of `stockroom.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{CacheBackendKind, CacheSettings};

pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
pub const DEFAULT_REDIS_POOL_SIZE: usize = 8;
pub const DEFAULT_REDIS_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// In-process LRU map.
    Memory,
    /// Shared Redis keyspace.
    Redis,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Maximum entries held by the in-memory substrate before LRU eviction.
    pub memory_capacity: usize,
    pub redis_url: Option<String>,
    pub redis_pool_size: usize,
    /// Upper bound on a single Redis round trip.
    pub redis_timeout: Duration,
    /// Substrate-level lifetime for entries. `None` keeps entries until evicted or deleted.
    pub entry_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            redis_url: None,
            redis_pool_size: DEFAULT_REDIS_POOL_SIZE,
            redis_timeout: Duration::from_millis(DEFAULT_REDIS_TIMEOUT_MS),
            entry_ttl: None,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            backend: match settings.backend {
                CacheBackendKind::Memory => CacheBackend::Memory,
                CacheBackendKind::Redis => CacheBackend::Redis,
            },
            memory_capacity: settings.memory_capacity,
            redis_url: settings.redis_url.clone(),
            redis_pool_size: settings.redis_pool_size.get(),
            redis_timeout: settings.redis_timeout,
            entry_ttl: settings.entry_ttl,
        }
    }
}

impl CacheConfig {
    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn redis_pool_size_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.redis_pool_size).unwrap_or(NonZeroUsize::MIN)
    }
}
