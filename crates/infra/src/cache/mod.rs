//! Look-aside cache in front of the repositories.
//!
//! [`CacheStore`] is a plain string key/value store (process-local map or
//! Redis). [`CacheAside`] layers the record key scheme and the read-through /
//! write-populate / delete-invalidate rules on top of it.
//!
//! Cache failures never fail a request: they are logged and the call falls
//! through to the repository.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod aside;
pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use aside::CacheAside;
pub use in_memory::InMemoryCacheStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisCacheStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache entry could not be (de)serialized: {0}")]
    Codec(String),
}

/// String key/value store with no expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Remove every listed key; missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;
}

#[async_trait]
impl<S> CacheStore for Arc<S>
where
    S: CacheStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        (**self).delete(keys).await
    }
}
