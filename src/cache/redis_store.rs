//! Redis-backed cache substrate for deployments with several API processes.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, PoolConfig as PoolSizing, Runtime};
use redis::AsyncCommands;

use super::config::CacheConfig;
use super::store::{CacheError, CacheStore};

pub struct RedisCacheStore {
    pool: Pool,
    timeout: Duration,
    ttl_secs: Option<u64>,
}

impl RedisCacheStore {
    /// Build the connection pool. No connection is opened until first use.
    pub fn connect(url: &str, config: &CacheConfig) -> Result<Self, CacheError> {
        let mut pool_config = PoolConfig::from_url(url);
        pool_config.pool = Some(PoolSizing::new(config.redis_pool_size_non_zero().get()));
        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| CacheError::Unavailable(format!("invalid redis configuration: {err}")))?;

        Ok(Self {
            pool,
            timeout: config.redis_timeout,
            // Redis rejects a zero expiry, so sub-second TTLs round up.
            ttl_secs: config.entry_ttl.map(|ttl| ttl.as_secs().max(1)),
        })
    }

    /// Round-trip a `PING` to confirm the server is reachable.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _pong: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        match tokio::time::timeout(self.timeout, self.pool.get()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(err)) => Err(CacheError::Unavailable(err.to_string())),
            Err(_) => Err(CacheError::Unavailable(format!(
                "no redis connection within {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn bounded<T>(
        &self,
        command: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.timeout, command).await {
            Ok(result) => result.map_err(|err| CacheError::Backend(err.to_string())),
            Err(_) => Err(CacheError::Unavailable(format!(
                "redis command exceeded {} ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        match self.ttl_secs {
            Some(ttl) => {
                self.bounded(async move { conn.set_ex::<_, _, ()>(key, value, ttl).await })
                    .await
            }
            None => {
                self.bounded(async move { conn.set::<_, _, ()>(key, value).await })
                    .await
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // DEL reports how many keys it removed; zero is still success.
        self.bounded(async move { conn.del::<_, u64>(key).await.map(|_| ()) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_malformed_url() {
        let config = CacheConfig::default();
        assert!(RedisCacheStore::connect("not a url", &config).is_err());
    }

    #[tokio::test]
    async fn sub_second_ttl_rounds_up() {
        let config = CacheConfig {
            entry_ttl: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let store = RedisCacheStore::connect("redis://127.0.0.1:6379", &config).expect("pool");
        assert_eq!(store.ttl_secs, Some(1));
    }
}
