//! Document-store repository: each record is one JSONB document in a
//! Postgres collection table (`user_documents`, `team_documents`).
//!
//! Lookups go through JSON path expressions; uniqueness of `ID` and non-empty
//! email is enforced by expression indexes, so violations surface as the same
//! `23505` the relational backend maps to `AlreadyExists`.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use roster_core::{Content, CreateRequest, IdUuid, Metadata, Record, UpdateRequest};

use super::postgres::{map_sqlx_error, ping};
use super::{
    DEFAULT_BACKEND_TIMEOUT, Repository, RepositoryError, RepositoryResult, resolve_uuid,
    with_timeout,
};

/// JSON path selecting each alternate lookup key inside a document.
#[derive(Debug, Copy, Clone)]
enum DocKey {
    Id,
    Name,
    Email,
}

impl DocKey {
    fn expr(self) -> &'static str {
        match self {
            DocKey::Id => "doc->>'ID'",
            DocKey::Name => "doc->'metadata'->>'name'",
            DocKey::Email => "doc->'content'->>'email'",
        }
    }
}

pub struct DocumentRepository<C> {
    pool: Arc<PgPool>,
    timeout: Duration,
    _content: PhantomData<fn() -> C>,
}

impl<C: Content> DocumentRepository<C> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            timeout: DEFAULT_BACKEND_TIMEOUT,
            _content: PhantomData,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn collection(&self) -> String {
        format!("{}_documents", C::KIND.as_str())
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        let coll = self.collection();
        let statements = [
            format!("CREATE TABLE IF NOT EXISTS {coll} (uuid TEXT PRIMARY KEY, doc JSONB NOT NULL)"),
            format!("CREATE UNIQUE INDEX IF NOT EXISTS {coll}_id_key ON {coll} (({}))", DocKey::Id.expr()),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {coll}_email_key ON {coll} (({email})) WHERE {email} <> ''",
                email = DocKey::Email.expr()
            ),
        ];
        for sql in &statements {
            with_timeout(self.timeout, "ensure_schema", async {
                sqlx::query(sql)
                    .execute(&*self.pool)
                    .await
                    .map(|_| ())
                    .map_err(|e| map_sqlx_error(C::KIND, "ensure_schema", e))
            })
            .await?;
        }
        Ok(())
    }

    async fn find_one(&self, key: DocKey, value: &str) -> RepositoryResult<Record<C>> {
        let sql = format!(
            "SELECT doc FROM {} WHERE {} = $1 LIMIT 1",
            self.collection(),
            key.expr()
        );
        with_timeout(self.timeout, "find_one", async {
            let row = sqlx::query(&sql)
                .bind(value)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "find_one", e))?
                .ok_or(RepositoryError::NotFound(C::KIND))?;
            decode_doc::<C>(&row)
        })
        .await
    }

    /// Load, mutate and replace one document inside a transaction.
    async fn modify<T, F>(&self, operation: &'static str, uuid: &str, apply: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut Record<C>) -> T + Send,
        T: Send,
    {
        let coll = self.collection();
        let select = format!("SELECT doc FROM {coll} WHERE uuid = $1 FOR UPDATE");
        let replace = format!("UPDATE {coll} SET doc = $2 WHERE uuid = $1");

        with_timeout(self.timeout, operation, async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "begin_transaction", e))?;

            let row = sqlx::query(&select)
                .bind(uuid)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, operation, e))?
                .ok_or(RepositoryError::NotFound(C::KIND))?;
            let mut record = decode_doc::<C>(&row)?;
            let out = apply(&mut record);

            sqlx::query(&replace)
                .bind(uuid)
                .bind(Json(&record))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, operation, e))?;

            tx.commit()
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "commit_transaction", e))?;
            Ok(out)
        })
        .await
    }
}

fn decode_doc<C: Content>(row: &sqlx::postgres::PgRow) -> RepositoryResult<Record<C>> {
    let Json(record) = row
        .try_get::<Json<Record<C>>, _>("doc")
        .map_err(|e| map_sqlx_error(C::KIND, "decode_doc", e))?;
    Ok(record)
}

#[async_trait]
impl<C: Content> Repository<C> for DocumentRepository<C> {
    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn list_ids_and_uuids(&self) -> RepositoryResult<Vec<IdUuid>> {
        let sql = format!(
            "SELECT {} AS id, uuid FROM {}",
            DocKey::Id.expr(),
            self.collection()
        );
        with_timeout(self.timeout, "list_ids_and_uuids", async {
            let rows = sqlx::query(&sql)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "list_ids_and_uuids", e))?;
            rows.iter()
                .map(|row| -> Result<IdUuid, sqlx::Error> {
                    let id: Option<String> = row.try_get("id")?;
                    Ok(IdUuid::new(id.unwrap_or_default(), row.try_get::<String, _>("uuid")?))
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(|e| map_sqlx_error(C::KIND, "decode_row", e))
        })
        .await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn list(&self) -> RepositoryResult<Vec<Record<C>>> {
        let sql = format!("SELECT doc FROM {}", self.collection());
        with_timeout(self.timeout, "list", async {
            let rows = sqlx::query(&sql)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "list", e))?;
            rows.iter().map(decode_doc::<C>).collect()
        })
        .await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn get(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        let sql = format!("SELECT doc FROM {} WHERE uuid = $1", self.collection());
        with_timeout(self.timeout, "get", async {
            let row = sqlx::query(&sql)
                .bind(uuid)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "get", e))?
                .ok_or(RepositoryError::NotFound(C::KIND))?;
            decode_doc::<C>(&row)
        })
        .await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn get_by_id(&self, id: &str) -> RepositoryResult<Record<C>> {
        self.find_one(DocKey::Id, id).await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn get_by_name(&self, name: &str) -> RepositoryResult<Record<C>> {
        self.find_one(DocKey::Name, name).await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn get_by_email(&self, email: &str) -> RepositoryResult<Record<C>> {
        self.find_one(DocKey::Email, email).await
    }

    #[instrument(skip(self, request), fields(kind = %C::KIND, id = %request.id), err)]
    async fn create(&self, request: CreateRequest<C>) -> RepositoryResult<Record<C>> {
        let uuid = resolve_uuid(&request.uuid)?;
        let record = request.into_record(uuid);
        let sql = format!("INSERT INTO {} (uuid, doc) VALUES ($1, $2)", self.collection());

        with_timeout(self.timeout, "create", async {
            sqlx::query(&sql)
                .bind(&record.uuid)
                .bind(Json(&record))
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "create", e))
        })
        .await?;

        Ok(record)
    }

    #[instrument(skip(self, request), fields(kind = %C::KIND), err)]
    async fn update(&self, uuid: &str, request: UpdateRequest<C>) -> RepositoryResult<Record<C>> {
        self.modify("update", uuid, move |record| {
            record.apply_update(&request);
            record.clone()
        })
        .await
    }

    #[instrument(skip(self, metadata), fields(kind = %C::KIND), err)]
    async fn update_metadata(&self, uuid: &str, metadata: Metadata) -> RepositoryResult<Metadata> {
        self.modify("update_metadata", uuid, move |record| {
            record.metadata.merge(&metadata);
            record.metadata.clone()
        })
        .await
    }

    #[instrument(skip(self, content), fields(kind = %C::KIND), err)]
    async fn update_content(&self, uuid: &str, content: C) -> RepositoryResult<C> {
        self.modify("update_content", uuid, move |record| {
            record.content.merge(&content);
            record.content.clone()
        })
        .await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn delete(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        let sql = format!(
            "DELETE FROM {} WHERE uuid = $1 RETURNING doc",
            self.collection()
        );
        with_timeout(self.timeout, "delete", async {
            let row = sqlx::query(&sql)
                .bind(uuid)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "delete", e))?
                .ok_or(RepositoryError::NotFound(C::KIND))?;
            decode_doc::<C>(&row)
        })
        .await
    }

    async fn health_check(&self) -> RepositoryResult<()> {
        ping(&self.pool, self.timeout, C::KIND).await
    }
}
