//! Entity service: the one place create/update/delete rules are enforced.
//!
//! `EntityService<C>` composes a [`Repository`] with an optional
//! [`CacheAside`] and exposes the operations the transport layer calls. It is
//! generic over the content type, so users and teams run through identical
//! code.
//!
//! ## Create
//!
//! ```text
//! CreateRequest
//!   ↓
//! 1. Resolve UUID (sentinel → fresh v4, otherwise must parse)
//!   ↓
//! 2. Stamp createdAt / updatedAt if blank
//!   ↓
//! 3. Existence probe: name → email → ID → UUID (first hit wins → Conflict);
//!    a blank ID is probed too, so at most one record can hold it
//!   ↓
//! 4. Repository create (constraint violation → Conflict)
//!   ↓
//! 5. Populate cache under all four record keys
//! ```
//!
//! ## Update (full, metadata-only, content-only)
//!
//! ```text
//! 1. Validate path UUID (→ InvalidInput)
//! 2. Load current record from the repository (→ NotFound)
//! 3. A new email held by another record → Conflict
//! 4. Stamp updatedAt = now (RFC3339 UTC); updatedBy comes from the caller
//! 5. Repository write
//! 6. Invalidate the pre-update keys, populate the post-update keys
//! ```
//!
//! `ID` and `UUID` cannot change through an update. Step 6 drops keys a changed name/email/ID would otherwise leave pointing
//! at stale data.
//!
//! ## Delete
//!
//! Repository delete returns the pre-delete record; every key derived from it
//! is invalidated.
//!
//! ## Reads
//!
//! Every read, including the metadata/content projections and the lists, goes
//! through the cache-aside primitive. Projections are cut from the cached full
//! record.
//!
//! The check-then-insert in create is not atomic. Backends with database
//! constraints close that window; the memory and json-dir backends do not.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use roster_core::{
    CommonDate, Content, ContentResponse, CreateRequest, IdUuid, Metadata, MetadataResponse,
    Record, ServiceError, ServiceResult, UpdateContentRequest, UpdateMetadataRequest,
    UpdateRequest, normalize_uuid, now_rfc3339, validate_uuid,
};

use crate::cache::{CacheAside, CacheStore};
use crate::repository::{Repository, RepositoryError, RepositoryResult};

/// Keys checked by the existence probe. Blank keys are skipped, except that
/// create always probes `ID`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistenceQuery {
    pub name: String,
    pub email: String,
    pub id: String,
    pub uuid: String,
}

impl<C: Content> From<&CreateRequest<C>> for ExistenceQuery {
    fn from(request: &CreateRequest<C>) -> Self {
        Self {
            name: request.metadata.name.clone(),
            email: request.content.email().to_owned(),
            id: request.id.clone(),
            uuid: request.uuid.clone(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ProbeKey {
    Name,
    Email,
    Id,
    Uuid,
}

impl ProbeKey {
    const ORDER: [ProbeKey; 4] = [ProbeKey::Name, ProbeKey::Email, ProbeKey::Id, ProbeKey::Uuid];

    fn label(self) -> &'static str {
        match self {
            ProbeKey::Name => "name",
            ProbeKey::Email => "email",
            ProbeKey::Id => "ID",
            ProbeKey::Uuid => "UUID",
        }
    }

    fn value(self, query: &ExistenceQuery) -> &str {
        match self {
            ProbeKey::Name => &query.name,
            ProbeKey::Email => &query.email,
            ProbeKey::Id => &query.id,
            ProbeKey::Uuid => &query.uuid,
        }
    }
}

pub struct EntityService<C: Content> {
    repository: Arc<dyn Repository<C>>,
    cache: Option<CacheAside<C>>,
}

impl<C: Content> Clone for EntityService<C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: self.cache.clone(),
        }
    }
}

impl<C: Content> EntityService<C> {
    /// Service with caching disabled.
    pub fn new(repository: Arc<dyn Repository<C>>) -> Self {
        Self {
            repository,
            cache: None,
        }
    }

    pub fn with_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(CacheAside::new(store));
        self
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    async fn cached<T, F, Fut>(&self, key: String, load: F) -> RepositoryResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = RepositoryResult<T>> + Send,
    {
        match &self.cache {
            Some(cache) => cache.get_or_load(key, load).await,
            None => load().await,
        }
    }

    async fn refresh_cache(&self, before: Option<&Record<C>>, after: &Record<C>) {
        if let Some(cache) = &self.cache {
            if let Some(before) = before {
                cache.invalidate(before).await;
            }
            cache.populate(after).await;
        }
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn list_ids_and_uuids(&self) -> ServiceResult<Vec<IdUuid>> {
        let repo = &self.repository;
        Ok(self
            .cached(CacheAside::<C>::id_uuids_key(), move || repo.list_ids_and_uuids())
            .await?)
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn list(&self) -> ServiceResult<Vec<Record<C>>> {
        let repo = &self.repository;
        Ok(self
            .cached(CacheAside::<C>::list_key(), move || repo.list())
            .await?)
    }

    pub async fn list_metadata(&self) -> ServiceResult<Vec<MetadataResponse>> {
        Ok(self.list().await?.iter().map(Record::metadata_response).collect())
    }

    pub async fn list_content(&self) -> ServiceResult<Vec<ContentResponse<C>>> {
        Ok(self.list().await?.iter().map(Record::content_response).collect())
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn get(&self, uuid: &str) -> ServiceResult<Record<C>> {
        Ok(self.lookup(ProbeKey::Uuid, uuid).await?)
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Record<C>> {
        Ok(self.lookup(ProbeKey::Id, id).await?)
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn get_by_name(&self, name: &str) -> ServiceResult<Record<C>> {
        Ok(self.lookup(ProbeKey::Name, name).await?)
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn get_by_email(&self, email: &str) -> ServiceResult<Record<C>> {
        Ok(self.lookup(ProbeKey::Email, email).await?)
    }

    pub async fn get_metadata(&self, uuid: &str) -> ServiceResult<MetadataResponse> {
        self.get(uuid).await.map(|record| record.metadata_response())
    }

    pub async fn get_content(&self, uuid: &str) -> ServiceResult<ContentResponse<C>> {
        self.get(uuid).await.map(|record| record.content_response())
    }

    async fn lookup(&self, key: ProbeKey, value: &str) -> RepositoryResult<Record<C>> {
        let repo = &self.repository;
        match key {
            ProbeKey::Uuid => {
                self.cached(CacheAside::<C>::uuid_key(value), move || repo.get(value))
                    .await
            }
            ProbeKey::Id => {
                self.cached(CacheAside::<C>::id_key(value), move || repo.get_by_id(value))
                    .await
            }
            ProbeKey::Name => {
                self.cached(CacheAside::<C>::name_key(value), move || repo.get_by_name(value))
                    .await
            }
            ProbeKey::Email => {
                self.cached(CacheAside::<C>::email_key(value), move || {
                    repo.get_by_email(value)
                })
                .await
            }
        }
    }

    /// First probe key (name → email → ID → UUID) that resolves to a live record.
    async fn first_match(
        &self,
        query: &ExistenceQuery,
        probe_blank_id: bool,
    ) -> ServiceResult<Option<(ProbeKey, Record<C>)>> {
        for key in ProbeKey::ORDER {
            let value = key.value(query);
            if value.is_empty() && !(probe_blank_id && key == ProbeKey::Id) {
                continue;
            }
            match self.lookup(key, value).await {
                Ok(record) => return Ok(Some((key, record))),
                Err(RepositoryError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    /// Whether any probe key resolves to a live record (short-circuits).
    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn probe_existence(&self, query: &ExistenceQuery) -> ServiceResult<bool> {
        Ok(self.first_match(query, false).await?.is_some())
    }

    /// Number of distinct live records matched by any probe key.
    pub async fn count_matches(&self, query: &ExistenceQuery) -> ServiceResult<usize> {
        let mut uuids = HashSet::new();
        for key in ProbeKey::ORDER {
            let value = key.value(query);
            if value.is_empty() {
                continue;
            }
            match self.lookup(key, value).await {
                Ok(record) => {
                    uuids.insert(record.uuid);
                }
                Err(RepositoryError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(uuids.len())
    }

    pub async fn is_exist(&self, query: &ExistenceQuery) -> ServiceResult<bool> {
        self.probe_existence(query).await
    }

    pub async fn is_no_exist(&self, query: &ExistenceQuery) -> ServiceResult<bool> {
        Ok(!self.probe_existence(query).await?)
    }

    pub async fn is_at_least_one_exist(&self, query: &ExistenceQuery) -> ServiceResult<bool> {
        self.probe_existence(query).await
    }

    pub async fn is_exactly_one_exist(&self, query: &ExistenceQuery) -> ServiceResult<bool> {
        Ok(self.count_matches(query).await? == 1)
    }

    #[instrument(skip(self, request), fields(kind = %C::KIND, id = %request.id), err)]
    pub async fn create(&self, mut request: CreateRequest<C>) -> ServiceResult<Record<C>> {
        request.uuid = normalize_uuid(&request.uuid)?;
        request.metadata.dates.stamp_created(&now_rfc3339());

        let query = ExistenceQuery::from(&request);
        if let Some((key, existing)) = self.first_match(&query, true).await? {
            tracing::info!(key = key.label(), existing = %existing.uuid, "create rejected");
            return Err(ServiceError::conflict(format!(
                "{} with {} '{}' already exists",
                C::KIND,
                key.label(),
                key.value(&query)
            )));
        }

        let record = self.repository.create(request).await?;
        self.refresh_cache(None, &record).await;
        tracing::info!(uuid = %record.uuid, "created");
        Ok(record)
    }

    /// Reject an email change that would collide with another live record.
    async fn ensure_email_free(&self, current: &Record<C>, email: &str) -> ServiceResult<()> {
        if email.is_empty() || email == current.email() {
            return Ok(());
        }
        match self.lookup(ProbeKey::Email, email).await {
            Ok(other) if other.uuid != current.uuid => {
                tracing::info!(existing = %other.uuid, "update rejected");
                Err(ServiceError::conflict(format!(
                    "{} with email '{email}' already exists",
                    C::KIND
                )))
            }
            Ok(_) | Err(RepositoryError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, request), fields(kind = %C::KIND), err)]
    pub async fn update(
        &self,
        uuid: &str,
        mut request: UpdateRequest<C>,
    ) -> ServiceResult<Record<C>> {
        let uuid = validate_uuid(uuid)?;
        let current = self.repository.get(&uuid).await?;
        self.ensure_email_free(&current, request.content.email()).await?;

        request.uuid = uuid.clone();
        request.metadata.stamp_updated(&now_rfc3339());
        let updated = self.repository.update(&uuid, request).await?;

        self.refresh_cache(Some(&current), &updated).await;
        Ok(updated)
    }

    #[instrument(skip(self, request), fields(kind = %C::KIND), err)]
    pub async fn update_metadata(
        &self,
        uuid: &str,
        request: UpdateMetadataRequest,
    ) -> ServiceResult<MetadataResponse> {
        let uuid = validate_uuid(uuid)?;
        let current = self.repository.get(&uuid).await?;

        let mut metadata = request.metadata;
        metadata.stamp_updated(&now_rfc3339());
        let merged = self.repository.update_metadata(&uuid, metadata).await?;

        let updated = Record {
            metadata: merged,
            ..current.clone()
        };
        self.refresh_cache(Some(&current), &updated).await;
        Ok(updated.metadata_response())
    }

    /// Content-only update; `updatedAt` is stamped by a metadata write that
    /// leaves every other metadata field as stored.
    #[instrument(skip(self, request), fields(kind = %C::KIND), err)]
    pub async fn update_content(
        &self,
        uuid: &str,
        request: UpdateContentRequest<C>,
    ) -> ServiceResult<ContentResponse<C>> {
        let uuid = validate_uuid(uuid)?;
        let current = self.repository.get(&uuid).await?;
        self.ensure_email_free(&current, request.content.email()).await?;

        let content = self.repository.update_content(&uuid, request.content).await?;
        let stamp = Metadata {
            name: String::new(),
            dates: CommonDate {
                updated_at: now_rfc3339(),
                ..CommonDate::default()
            },
        };
        let metadata = self.repository.update_metadata(&uuid, stamp).await?;

        let updated = Record {
            metadata,
            content,
            ..current.clone()
        };

        self.refresh_cache(Some(&current), &updated).await;
        Ok(updated.content_response())
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn delete(&self, uuid: &str) -> ServiceResult<Record<C>> {
        let deleted = self.repository.delete(uuid).await?;
        if let Some(cache) = &self.cache {
            cache.invalidate(&deleted).await;
        }
        tracing::info!(uuid = %deleted.uuid, "deleted");
        Ok(deleted)
    }

    /// Readiness of the underlying backend.
    pub async fn health_check(&self) -> ServiceResult<()> {
        Ok(self.repository.health_check().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::repository::InMemoryRepository;
    use roster_core::{EntityKind, UserContent};

    /// In-memory repository that counts backend calls per operation.
    #[derive(Default)]
    struct CountingRepository {
        inner: InMemoryRepository<UserContent>,
        calls: Mutex<HashMap<&'static str, usize>>,
    }

    impl CountingRepository {
        fn hit(&self, op: &'static str) {
            *self.calls.lock().unwrap().entry(op).or_default() += 1;
        }

        fn calls(&self, op: &'static str) -> usize {
            self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Repository<UserContent> for CountingRepository {
        async fn list_ids_and_uuids(&self) -> RepositoryResult<Vec<IdUuid>> {
            self.hit("list_ids_and_uuids");
            self.inner.list_ids_and_uuids().await
        }

        async fn list(&self) -> RepositoryResult<Vec<Record<UserContent>>> {
            self.hit("list");
            self.inner.list().await
        }

        async fn get(&self, uuid: &str) -> RepositoryResult<Record<UserContent>> {
            self.hit("get");
            self.inner.get(uuid).await
        }

        async fn get_by_id(&self, id: &str) -> RepositoryResult<Record<UserContent>> {
            self.hit("get_by_id");
            self.inner.get_by_id(id).await
        }

        async fn get_by_name(&self, name: &str) -> RepositoryResult<Record<UserContent>> {
            self.hit("get_by_name");
            self.inner.get_by_name(name).await
        }

        async fn get_by_email(&self, email: &str) -> RepositoryResult<Record<UserContent>> {
            self.hit("get_by_email");
            self.inner.get_by_email(email).await
        }

        async fn create(
            &self,
            request: CreateRequest<UserContent>,
        ) -> RepositoryResult<Record<UserContent>> {
            self.hit("create");
            self.inner.create(request).await
        }

        async fn update(
            &self,
            uuid: &str,
            request: UpdateRequest<UserContent>,
        ) -> RepositoryResult<Record<UserContent>> {
            self.hit("update");
            self.inner.update(uuid, request).await
        }

        async fn update_metadata(
            &self,
            uuid: &str,
            metadata: Metadata,
        ) -> RepositoryResult<Metadata> {
            self.hit("update_metadata");
            self.inner.update_metadata(uuid, metadata).await
        }

        async fn update_content(
            &self,
            uuid: &str,
            content: UserContent,
        ) -> RepositoryResult<UserContent> {
            self.hit("update_content");
            self.inner.update_content(uuid, content).await
        }

        async fn delete(&self, uuid: &str) -> RepositoryResult<Record<UserContent>> {
            self.hit("delete");
            self.inner.delete(uuid).await
        }
    }

    fn setup(cache: bool) -> (Arc<CountingRepository>, EntityService<UserContent>) {
        let repo = Arc::new(CountingRepository::default());
        let mut service = EntityService::new(repo.clone());
        if cache {
            service = service.with_cache(Arc::new(InMemoryCacheStore::new()));
        }
        (repo, service)
    }

    fn test_request(id: &str, name: &str, email: &str) -> CreateRequest<UserContent> {
        CreateRequest {
            id: id.into(),
            uuid: String::new(),
            metadata: Metadata::named(name),
            content: UserContent {
                email: email.into(),
                ..UserContent::default()
            },
        }
    }

    fn not_found<T>() -> ServiceResult<T> {
        Err(ServiceError::NotFound(EntityKind::User))
    }

    #[tokio::test]
    async fn create_rejects_any_colliding_key() {
        let (repo, service) = setup(false);
        let first = service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();

        let collisions = [
            test_request("u2", "john.doe", "other@x"),
            test_request("u2", "other", "john@x"),
            test_request("u1", "other", "other@x"),
            CreateRequest {
                uuid: first.uuid.clone(),
                ..test_request("u2", "other", "other@x")
            },
        ];
        for request in collisions {
            let err = service.create(request).await.unwrap_err();
            assert!(matches!(err, ServiceError::Conflict(_)), "{err:?}");
        }
        assert_eq!(repo.calls("create"), 1);
    }

    #[tokio::test]
    async fn probe_short_circuits_on_first_hit() {
        let (repo, service) = setup(false);
        service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();
        let before = repo.calls("get_by_email");

        let query = ExistenceQuery {
            name: "john.doe".into(),
            email: "john@x".into(),
            ..ExistenceQuery::default()
        };
        assert!(service.probe_existence(&query).await.unwrap());
        assert_eq!(repo.calls("get_by_email"), before);
    }

    #[tokio::test]
    async fn existence_variants_agree_with_one_probe() {
        let (_repo, service) = setup(false);
        let a = service.create(test_request("u1", "a", "a@x")).await.unwrap();
        service.create(test_request("u2", "b", "b@x")).await.unwrap();

        let one = ExistenceQuery {
            name: "a".into(),
            uuid: a.uuid.clone(),
            ..ExistenceQuery::default()
        };
        let two = ExistenceQuery {
            name: "a".into(),
            email: "b@x".into(),
            ..ExistenceQuery::default()
        };
        let none = ExistenceQuery {
            name: "zzz".into(),
            ..ExistenceQuery::default()
        };

        assert!(service.is_exist(&one).await.unwrap());
        assert!(service.is_exactly_one_exist(&one).await.unwrap());
        assert!(!service.is_exactly_one_exist(&two).await.unwrap());
        assert!(service.is_at_least_one_exist(&two).await.unwrap());
        assert!(service.is_no_exist(&none).await.unwrap());
        assert!(!service.is_no_exist(&one).await.unwrap());
    }

    #[tokio::test]
    async fn sentinel_uuid_gets_fresh_v4() {
        let (_repo, service) = setup(false);
        let mut request = test_request("u1", "john.doe", "john@x");
        request.uuid = "undefined".into();

        let created = service.create(request).await.unwrap();

        let uuid = uuid::Uuid::parse_str(&created.uuid).unwrap();
        assert_eq!(uuid.get_version_num(), 4);
        assert!(!created.metadata.dates.created_at.is_empty());
    }

    #[tokio::test]
    async fn malformed_uuid_on_update_is_invalid_input() {
        let (repo, service) = setup(false);
        let err = service
            .update("not-a-uuid", UpdateRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(repo.calls("get"), 0);
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let (_repo, service) = setup(false);
        let missing = uuid::Uuid::new_v4().to_string();
        assert_eq!(
            service.update(&missing, UpdateRequest::default()).await,
            not_found()
        );
        assert_eq!(
            service
                .update_metadata(&missing, UpdateMetadataRequest::default())
                .await,
            not_found()
        );
        assert_eq!(
            service
                .update_content(&missing, UpdateContentRequest::default())
                .await,
            not_found()
        );
    }

    #[tokio::test]
    async fn updates_stamp_updated_at_and_keep_created_at() {
        let (_repo, service) = setup(false);
        let mut request = test_request("u1", "john.doe", "john@x");
        request.metadata.dates.created_at = "2020-01-01T00:00:00Z".into();
        request.metadata.dates.updated_at = "2020-01-01T00:00:00Z".into();
        let created = service.create(request).await.unwrap();

        let mut patch = UpdateRequest::default();
        patch.metadata.dates.updated_by = "bob".into();
        let updated = service.update(&created.uuid, patch).await.unwrap();
        assert_eq!(updated.metadata.dates.created_at, "2020-01-01T00:00:00Z");
        assert!(updated.metadata.dates.updated_at > created.metadata.dates.updated_at);
        assert_eq!(updated.metadata.dates.updated_by, "bob");

        let content = service
            .update_content(
                &created.uuid,
                UpdateContentRequest {
                    uuid: String::new(),
                    content: UserContent {
                        phone: "555".into(),
                        ..UserContent::default()
                    },
                },
            )
            .await
            .unwrap();
        assert_eq!(content.content.phone, "555");
        assert_eq!(content.content.email, "john@x");
        let stored = service.get(&created.uuid).await.unwrap();
        assert!(stored.metadata.dates.updated_at > created.metadata.dates.updated_at);
        assert_eq!(stored.metadata.dates.created_at, "2020-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn path_uuid_wins_over_body_uuid() {
        let (_repo, service) = setup(false);
        let created = service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();
        let patch = UpdateRequest {
            uuid: uuid::Uuid::new_v4().to_string(),
            ..UpdateRequest::default()
        };
        let updated = service.update(&created.uuid, patch).await.unwrap();
        assert_eq!(updated.uuid, created.uuid);
    }

    #[tokio::test]
    async fn repeated_get_hits_backend_once_when_cached() {
        let (repo, service) = setup(true);
        let created = service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();
        let baseline = repo.calls("get");

        let first = service.get(&created.uuid).await.unwrap();
        let second = service.get(&created.uuid).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.calls("get") - baseline, 0);
        assert_eq!(service.get_by_email("john@x").await.unwrap(), created);
        assert_eq!(repo.calls("get_by_email"), 1, "probe miss only");
    }

    #[tokio::test]
    async fn repeated_get_hits_backend_each_time_without_cache() {
        let (repo, service) = setup(false);
        let created = service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();
        let baseline = repo.calls("get");

        service.get(&created.uuid).await.unwrap();
        service.get(&created.uuid).await.unwrap();

        assert_eq!(repo.calls("get") - baseline, 2);
    }

    #[tokio::test]
    async fn projections_are_served_from_the_cached_record() {
        let (repo, service) = setup(true);
        let created = service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();
        let baseline = repo.calls("get");

        let metadata = service.get_metadata(&created.uuid).await.unwrap();
        let content = service.get_content(&created.uuid).await.unwrap();

        assert_eq!(metadata.metadata.name, "john.doe");
        assert_eq!(content.content.email, "john@x");
        assert_eq!(repo.calls("get"), baseline);
    }

    #[tokio::test]
    async fn email_change_drops_the_old_email_key() {
        let (_repo, service) = setup(true);
        let created = service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();

        let patch = UpdateRequest {
            content: UserContent {
                email: "john@y".into(),
                ..UserContent::default()
            },
            ..UpdateRequest::default()
        };
        service.update(&created.uuid, patch).await.unwrap();

        assert_eq!(service.get_by_email("john@x").await, not_found());
        assert_eq!(
            service.get_by_email("john@y").await.unwrap().uuid,
            created.uuid
        );
    }

    #[tokio::test]
    async fn list_is_invalidated_by_writes() {
        let (_repo, service) = setup(true);
        service.create(test_request("u1", "a", "a@x")).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);

        let b = service.create(test_request("u2", "b", "b@x")).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 2);
        assert_eq!(service.list_ids_and_uuids().await.unwrap().len(), 2);

        service.delete(&b.uuid).await.unwrap();
        assert_eq!(service.list_metadata().await.unwrap().len(), 1);
        assert_eq!(service.list_content().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_every_lookup_path() {
        for cache in [false, true] {
            let (_repo, service) = setup(cache);
            let created = service
                .create(test_request("u1", "john.doe", "john@x"))
                .await
                .unwrap();
            // Warm every key.
            service.get(&created.uuid).await.unwrap();
            service.get_by_id("u1").await.unwrap();
            service.get_by_name("john.doe").await.unwrap();

            let deleted = service.delete(&created.uuid).await.unwrap();
            assert_eq!(deleted, created);

            assert_eq!(service.get(&created.uuid).await, not_found());
            assert_eq!(service.get_by_id("u1").await, not_found());
            assert_eq!(service.get_by_name("john.doe").await, not_found());
            assert_eq!(service.get_by_email("john@x").await, not_found());
            assert_eq!(service.delete(&created.uuid).await, not_found());
        }
    }

    #[tokio::test]
    async fn supplied_uuid_is_stored_as_written() {
        let (_repo, service) = setup(true);
        let supplied = "2F1D0B7E-4B43-4B8E-9A51-3C54E6F6A001";
        let request = CreateRequest {
            uuid: supplied.into(),
            ..test_request("u1", "john.doe", "john@x")
        };

        let created = service.create(request).await.unwrap();
        assert_eq!(created.uuid, supplied);

        assert_eq!(service.get(supplied).await.unwrap().uuid, supplied);
        let mut patch = UpdateRequest::default();
        patch.metadata.dates.updated_by = "bob".into();
        assert_eq!(service.update(supplied, patch).await.unwrap().uuid, supplied);
        assert_eq!(service.delete(supplied).await.unwrap().uuid, supplied);
        assert_eq!(service.get(supplied).await, not_found());
    }

    #[tokio::test]
    async fn blank_id_can_only_be_held_once() {
        let (repo, service) = setup(false);
        service.create(test_request("", "a", "a@x")).await.unwrap();

        let err = service
            .create(test_request("", "b", "b@x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)), "{err:?}");
        assert_eq!(repo.calls("create"), 1);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn email_change_onto_a_live_record_conflicts() {
        for cache in [false, true] {
            let (_repo, service) = setup(cache);
            service.create(test_request("u1", "a", "a@x")).await.unwrap();
            let c = service.create(test_request("u3", "c", "c@x")).await.unwrap();
            let taken = UserContent {
                email: "a@x".into(),
                ..UserContent::default()
            };

            let err = service
                .update(
                    &c.uuid,
                    UpdateRequest {
                        content: taken.clone(),
                        ..UpdateRequest::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Conflict(_)), "{err:?}");

            let err = service
                .update_content(
                    &c.uuid,
                    UpdateContentRequest {
                        uuid: String::new(),
                        content: taken,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Conflict(_)), "{err:?}");

            assert_eq!(service.get(&c.uuid).await.unwrap().content.email, "c@x");
            assert_eq!(service.get_by_email("a@x").await.unwrap().id, "u1");

            // Re-sending a record's own email is not a collision.
            let own = UpdateContentRequest {
                uuid: String::new(),
                content: UserContent {
                    email: "c@x".into(),
                    ..UserContent::default()
                },
            };
            service.update_content(&c.uuid, own).await.unwrap();
        }
    }

    #[tokio::test]
    async fn content_update_writes_content_and_stamps_metadata() {
        let (repo, service) = setup(true);
        let created = service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();

        let request = UpdateContentRequest {
            uuid: String::new(),
            content: UserContent {
                phone: "555".into(),
                ..UserContent::default()
            },
        };
        let response = service.update_content(&created.uuid, request).await.unwrap();

        assert_eq!(repo.calls("update_content"), 1);
        assert_eq!(repo.calls("update_metadata"), 1);
        assert_eq!(repo.calls("update"), 0);
        assert_eq!(response.content.phone, "555");

        let cached = service.get(&created.uuid).await.unwrap();
        assert_eq!(cached.content.phone, "555");
        assert_eq!(cached.metadata.name, "john.doe");
        assert!(cached.metadata.dates.updated_at >= created.metadata.dates.updated_at);
    }

    #[tokio::test]
    async fn john_doe_lifecycle() {
        let (_repo, service) = setup(true);

        let created = service
            .create(test_request("u1", "john.doe", "john@x"))
            .await
            .unwrap();
        assert_eq!(uuid::Uuid::parse_str(&created.uuid).unwrap().get_version_num(), 4);

        let dup = service
            .create(test_request("u2", "john.doe", "other@x"))
            .await
            .unwrap_err();
        assert!(matches!(dup, ServiceError::Conflict(_)));

        assert_eq!(service.get(&created.uuid).await.unwrap(), created);
        service.delete(&created.uuid).await.unwrap();
        assert_eq!(service.get(&created.uuid).await, not_found());
    }
}
