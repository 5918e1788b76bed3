use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use roster_core::{
    Content, CreateRequest, EntityKind, IdUuid, Metadata, Record, ServiceError, UpdateRequest,
};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No live record matched the key.
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// A uniqueness constraint enforced by the backend rejected the write.
    #[error("{kind} already exists: {detail}")]
    AlreadyExists { kind: EntityKind, detail: String },

    /// The request could not be stored as given (e.g. unparseable UUID).
    #[error("invalid input: {0}")]
    Invalid(String),

    /// The backend timed out or could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Any other storage failure (IO, serialization, SQL).
    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn already_exists(kind: EntityKind, detail: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            detail: detail.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(kind) => ServiceError::NotFound(kind),
            RepositoryError::AlreadyExists { kind, detail } => {
                ServiceError::Conflict(format!("{kind} already exists: {detail}"))
            }
            RepositoryError::Invalid(msg) => ServiceError::InvalidInput(msg),
            RepositoryError::Unavailable(msg) | RepositoryError::Storage(msg) => {
                ServiceError::BackendUnavailable(msg)
            }
        }
    }
}

/// Storage contract for one entity type.
///
/// Semantics shared by all implementations:
/// - lookups return `NotFound` rather than an empty record;
/// - `create` assigns a fresh UUID when given a sentinel;
/// - updates are partial overwrites and never change `UUID` or creation stamps;
/// - `delete` returns the record as it was before removal.
#[async_trait]
pub trait Repository<C: Content>: Send + Sync {
    async fn list_ids_and_uuids(&self) -> RepositoryResult<Vec<IdUuid>>;

    async fn list(&self) -> RepositoryResult<Vec<Record<C>>>;

    async fn get(&self, uuid: &str) -> RepositoryResult<Record<C>>;

    async fn get_by_id(&self, id: &str) -> RepositoryResult<Record<C>>;

    async fn get_by_name(&self, name: &str) -> RepositoryResult<Record<C>>;

    async fn get_by_email(&self, email: &str) -> RepositoryResult<Record<C>>;

    async fn create(&self, request: CreateRequest<C>) -> RepositoryResult<Record<C>>;

    async fn update(&self, uuid: &str, request: UpdateRequest<C>) -> RepositoryResult<Record<C>>;

    async fn update_metadata(&self, uuid: &str, metadata: Metadata) -> RepositoryResult<Metadata>;

    async fn update_content(&self, uuid: &str, content: C) -> RepositoryResult<C>;

    async fn get_metadata(&self, uuid: &str) -> RepositoryResult<Metadata> {
        self.get(uuid).await.map(|record| record.metadata)
    }

    async fn get_content(&self, uuid: &str) -> RepositoryResult<C> {
        self.get(uuid).await.map(|record| record.content)
    }

    async fn delete(&self, uuid: &str) -> RepositoryResult<Record<C>>;

    /// Readiness probe; network backends round-trip to the server.
    async fn health_check(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<C, R> Repository<C> for Arc<R>
where
    C: Content,
    R: Repository<C> + ?Sized,
{
    async fn list_ids_and_uuids(&self) -> RepositoryResult<Vec<IdUuid>> {
        (**self).list_ids_and_uuids().await
    }

    async fn list(&self) -> RepositoryResult<Vec<Record<C>>> {
        (**self).list().await
    }

    async fn get(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        (**self).get(uuid).await
    }

    async fn get_by_id(&self, id: &str) -> RepositoryResult<Record<C>> {
        (**self).get_by_id(id).await
    }

    async fn get_by_name(&self, name: &str) -> RepositoryResult<Record<C>> {
        (**self).get_by_name(name).await
    }

    async fn get_by_email(&self, email: &str) -> RepositoryResult<Record<C>> {
        (**self).get_by_email(email).await
    }

    async fn create(&self, request: CreateRequest<C>) -> RepositoryResult<Record<C>> {
        (**self).create(request).await
    }

    async fn update(&self, uuid: &str, request: UpdateRequest<C>) -> RepositoryResult<Record<C>> {
        (**self).update(uuid, request).await
    }

    async fn update_metadata(&self, uuid: &str, metadata: Metadata) -> RepositoryResult<Metadata> {
        (**self).update_metadata(uuid, metadata).await
    }

    async fn update_content(&self, uuid: &str, content: C) -> RepositoryResult<C> {
        (**self).update_content(uuid, content).await
    }

    async fn get_metadata(&self, uuid: &str) -> RepositoryResult<Metadata> {
        (**self).get_metadata(uuid).await
    }

    async fn get_content(&self, uuid: &str) -> RepositoryResult<C> {
        (**self).get_content(uuid).await
    }

    async fn delete(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        (**self).delete(uuid).await
    }

    async fn health_check(&self) -> RepositoryResult<()> {
        (**self).health_check().await
    }
}
