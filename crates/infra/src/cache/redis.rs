//! Redis-backed cache store (optional, `redis` feature).
//!
//! Entries are written without expiry, matching the process-local store.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use super::{CacheError, CacheStore};

#[derive(Clone)]
pub struct RedisCacheStore {
    conn: MultiplexedConnection,
}

impl RedisCacheStore {
    pub async fn connect(redis_url: impl AsRef<str>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}
