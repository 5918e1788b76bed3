use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use roster_core::{Content, CreateRequest, IdUuid, Metadata, Record, UpdateRequest};

use super::{Repository, RepositoryError, RepositoryResult, resolve_uuid};

/// In-memory repository for tests/dev, keyed by UUID.
#[derive(Debug)]
pub struct InMemoryRepository<C> {
    inner: RwLock<HashMap<String, Record<C>>>,
}

impl<C> InMemoryRepository<C> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<C> Default for InMemoryRepository<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::storage("in-memory repository lock poisoned")
}

impl<C: Content> InMemoryRepository<C> {
    fn find_by<F>(&self, matches: F) -> RepositoryResult<Record<C>>
    where
        F: Fn(&Record<C>) -> bool,
    {
        let map = self.inner.read().map_err(|_| poisoned())?;
        map.values()
            .find(|record| matches(record))
            .cloned()
            .ok_or(RepositoryError::NotFound(C::KIND))
    }

    fn modify<T, F>(&self, uuid: &str, apply: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut Record<C>) -> T,
    {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let record = map.get_mut(uuid).ok_or(RepositoryError::NotFound(C::KIND))?;
        Ok(apply(record))
    }
}

#[async_trait]
impl<C: Content> Repository<C> for InMemoryRepository<C> {
    async fn list_ids_and_uuids(&self) -> RepositoryResult<Vec<IdUuid>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().map(Record::id_uuid).collect())
    }

    async fn list(&self) -> RepositoryResult<Vec<Record<C>>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }

    async fn get(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        map.get(uuid).cloned().ok_or(RepositoryError::NotFound(C::KIND))
    }

    async fn get_by_id(&self, id: &str) -> RepositoryResult<Record<C>> {
        self.find_by(|r| r.id == id)
    }

    async fn get_by_name(&self, name: &str) -> RepositoryResult<Record<C>> {
        self.find_by(|r| r.name() == name)
    }

    async fn get_by_email(&self, email: &str) -> RepositoryResult<Record<C>> {
        self.find_by(|r| r.email() == email)
    }

    async fn create(&self, request: CreateRequest<C>) -> RepositoryResult<Record<C>> {
        let uuid = resolve_uuid(&request.uuid)?;
        let record = request.into_record(uuid);

        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&record.uuid) {
            return Err(RepositoryError::already_exists(
                C::KIND,
                format!("UUID {}", record.uuid),
            ));
        }
        map.insert(record.uuid.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, uuid: &str, request: UpdateRequest<C>) -> RepositoryResult<Record<C>> {
        self.modify(uuid, |record| {
            record.apply_update(&request);
            record.clone()
        })
    }

    async fn update_metadata(&self, uuid: &str, metadata: Metadata) -> RepositoryResult<Metadata> {
        self.modify(uuid, |record| {
            record.metadata.merge(&metadata);
            record.metadata.clone()
        })
    }

    async fn update_content(&self, uuid: &str, content: C) -> RepositoryResult<C> {
        self.modify(uuid, |record| {
            record.content.merge(&content);
            record.content.clone()
        })
    }

    async fn delete(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(uuid).ok_or(RepositoryError::NotFound(C::KIND))
    }
}
