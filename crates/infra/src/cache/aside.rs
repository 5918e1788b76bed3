//! Cache-aside key scheme and read/write rules for one entity type.
//!
//! ```text
//!   read(key) ──► cache hit? ──yes──► decoded value
//!                    │ no
//!                    ▼
//!               repository ──► set(key) ──► value
//!
//!   write ok  ──► set <kind>:<UUID>, <kind>ByName:, <kind>ByEmail:, <kind>ByID:
//!                 drop list keys
//!   delete ok ──► drop the four record keys + list keys
//! ```
//!
//! A read populates only the key it was asked for; writes populate all four
//! record keys so later lookups by any path hit.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use roster_core::{Content, Record};

use super::{CacheError, CacheStore};
use crate::repository::RepositoryResult;

pub struct CacheAside<C> {
    store: Arc<dyn CacheStore>,
    _content: PhantomData<fn() -> C>,
}

impl<C> Clone for CacheAside<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _content: PhantomData,
        }
    }
}

impl<C: Content> CacheAside<C> {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            _content: PhantomData,
        }
    }

    pub fn uuid_key(uuid: &str) -> String {
        format!("{}:{uuid}", C::KIND.as_str())
    }

    pub fn name_key(name: &str) -> String {
        format!("{}ByName:{name}", C::KIND.as_str())
    }

    pub fn email_key(email: &str) -> String {
        format!("{}ByEmail:{email}", C::KIND.as_str())
    }

    pub fn id_key(id: &str) -> String {
        format!("{}ByID:{id}", C::KIND.as_str())
    }

    pub fn list_key() -> String {
        C::KIND.plural().to_string()
    }

    pub fn id_uuids_key() -> String {
        format!("{}IdsAndUUIDs", C::KIND.plural())
    }

    /// The four lookup keys a record is reachable under (blank values skipped).
    pub fn record_keys(record: &Record<C>) -> Vec<String> {
        let mut keys = vec![Self::uuid_key(&record.uuid)];
        if !record.name().is_empty() {
            keys.push(Self::name_key(record.name()));
        }
        if !record.email().is_empty() {
            keys.push(Self::email_key(record.email()));
        }
        if !record.id.is_empty() {
            keys.push(Self::id_key(&record.id));
        }
        keys
    }

    fn list_keys() -> Vec<String> {
        vec![Self::list_key(), Self::id_uuids_key()]
    }

    /// Read-through: serve `key` from the cache, else load and populate it.
    pub async fn get_or_load<T, F, Fut>(&self, key: String, load: F) -> RepositoryResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = RepositoryResult<T>> + Send,
    {
        match self.lookup::<T>(&key).await {
            Ok(Some(value)) => {
                tracing::debug!(%key, "cache hit");
                return Ok(value);
            }
            Ok(None) => tracing::debug!(%key, "cache miss"),
            Err(e) => tracing::warn!(%key, error = %e, "cache read failed"),
        }

        let value = load().await?;
        if let Err(e) = self.store_value(&key, &value).await {
            tracing::warn!(%key, error = %e, "cache populate failed");
        }
        Ok(value)
    }

    /// After a successful create/update: write every record key, drop list keys.
    pub async fn populate(&self, record: &Record<C>) {
        for key in Self::record_keys(record) {
            if let Err(e) = self.store_value(&key, record).await {
                tracing::warn!(%key, error = %e, "cache populate failed");
            }
        }
        self.drop_keys(&Self::list_keys()).await;
    }

    /// After a successful delete (or before re-keying an update): drop every
    /// key the record was reachable under, plus list keys.
    pub async fn invalidate(&self, record: &Record<C>) {
        let mut keys = Self::record_keys(record);
        keys.extend(Self::list_keys());
        self.drop_keys(&keys).await;
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CacheError::Codec(e.to_string())),
            None => Ok(None),
        }
    }

    async fn store_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Codec(e.to_string()))?;
        self.store.set(key, raw).await
    }

    async fn drop_keys(&self, keys: &[String]) {
        if let Err(e) = self.store.delete(keys).await {
            tracing::warn!(?keys, error = %e, "cache invalidation failed");
        }
    }
}
