use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{CacheError, CacheStore};

/// Process-local cache store.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    inner: RwLock<HashMap<String, String>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .read()
            .map(|map| map.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CacheError {
    CacheError::Backend("in-memory cache lock poisoned".to_string())
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }
}
