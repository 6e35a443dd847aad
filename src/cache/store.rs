//! Cache substrate abstraction and the in-process implementation.
//!
//! The substrate is a plain string key/value space. It owns entry lifetime:
//! callers never pass an expiry.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache substrate unavailable: {0}")]
    Unavailable(String),
    #[error("cache substrate error: {0}")]
    Backend(String),
    #[error("cached value could not be decoded: {0}")]
    Codec(String),
}

/// Key/value substrate shared by every request.
///
/// Deleting an absent key succeeds.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name used in logs and metric labels.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Bounded in-process substrate with least-recently-used eviction.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, Entry>>,
    ttl: Option<Duration>,
}

impl MemoryCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.memory_capacity_non_zero())),
            ttl: config.entry_ttl,
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Presence check that neither promotes the entry nor honours expiry.
    pub fn contains(&self, key: &str) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains(key)
    }

    fn get_sync(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        // `LruCache::get` updates recency, so a write guard is required.
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    fn set_sync(&self, key: &str, value: String) {
        let entry = Entry {
            value,
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        };
        let displaced = rw_write(&self.entries, SOURCE, "set").push(key.to_string(), entry);
        if displaced.is_some_and(|(displaced_key, _)| displaced_key != key) {
            counter!("stockroom_item_cache_evict_total").increment(1);
        }
    }

    fn delete_sync(&self, key: &str) {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.get_sync(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.set_sync(key, value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.delete_sync(key);
        Ok(())
    }
}
