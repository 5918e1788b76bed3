//! Relational repository on Postgres.
//!
//! One table per entity type (`users`, `teams`). Identity, lookup keys and
//! audit dates are typed columns; the type-specific content is a JSONB column.
//!
//! ## Error Mapping
//!
//! | Source | SQLSTATE | `RepositoryError` |
//! |--------|----------|-------------------|
//! | unique violation (`uuid`, `id`, non-empty `email`) | `23505` | `AlreadyExists` |
//! | no row for the key | n/a | `NotFound` |
//! | pool timeout / closed pool / IO | n/a | `Unavailable` |
//! | call exceeded the configured timeout | n/a | `Unavailable` |
//! | anything else | any | `Storage` |
//!
//! `create` does not pre-check uniqueness: the constraints are the authority,
//! and two racing creates with the same `ID` resolve to one `AlreadyExists`.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use roster_core::{
    CommonDate, Content, CreateRequest, EntityKind, IdUuid, Metadata, Record, UpdateRequest,
};

use super::{
    DEFAULT_BACKEND_TIMEOUT, Repository, RepositoryError, RepositoryResult, resolve_uuid,
    with_timeout,
};

const COLUMNS: &str = "uuid, id, name, email, created_at, created_by, updated_at, updated_by, \
    started_at, started_by, start_date, end_date, completed_at, completed_by, content";

pub struct PostgresRepository<C> {
    pool: Arc<PgPool>,
    timeout: Duration,
    _content: PhantomData<fn() -> C>,
}

impl<C> Clone for PostgresRepository<C> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            timeout: self.timeout,
            _content: PhantomData,
        }
    }
}

impl<C: Content> PostgresRepository<C> {
    /// Create a repository over the given connection pool.
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

    fn table(&self) -> &'static str {
        C::KIND.plural()
    }

    /// Create the table and its unique indexes if they do not exist.
    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        let table = self.table();
        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    uuid TEXT PRIMARY KEY,
                    id TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL DEFAULT '',
                    email TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL DEFAULT '',
                    created_by TEXT NOT NULL DEFAULT '',
                    updated_at TEXT NOT NULL DEFAULT '',
                    updated_by TEXT NOT NULL DEFAULT '',
                    started_at TEXT NOT NULL DEFAULT '',
                    started_by TEXT NOT NULL DEFAULT '',
                    start_date TEXT NOT NULL DEFAULT '',
                    end_date TEXT NOT NULL DEFAULT '',
                    completed_at TEXT NOT NULL DEFAULT '',
                    completed_by TEXT NOT NULL DEFAULT '',
                    content JSONB NOT NULL DEFAULT '{{}}'::jsonb
                )
                "#
            ),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {table}_email_key ON {table} (email) WHERE email <> ''"
            ),
            format!("CREATE INDEX IF NOT EXISTS {table}_name_idx ON {table} (name)"),
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

    async fn fetch_one_by(&self, column: &'static str, value: &str) -> RepositoryResult<Record<C>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE {column} = $1 LIMIT 1",
            self.table()
        );
        with_timeout(self.timeout, column, async {
            let row = sqlx::query(&sql)
                .bind(value)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "fetch_one", e))?;
            match row {
                Some(row) => RecordRow::from_row(&row)
                    .map_err(|e| map_sqlx_error(C::KIND, "decode_row", e))?
                    .into_record::<C>(),
                None => Err(RepositoryError::NotFound(C::KIND)),
            }
        })
        .await
    }

    async fn lock_row(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: &str,
    ) -> RepositoryResult<Record<C>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE uuid = $1 FOR UPDATE",
            self.table()
        );
        let row = sqlx::query(&sql)
            .bind(uuid)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error(C::KIND, "lock_row", e))?
            .ok_or(RepositoryError::NotFound(C::KIND))?;
        RecordRow::from_row(&row)
            .map_err(|e| map_sqlx_error(C::KIND, "decode_row", e))?
            .into_record::<C>()
    }

    async fn write_row(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &Record<C>,
    ) -> RepositoryResult<()> {
        let sql = format!(
            r#"
            UPDATE {} SET
                id = $2, name = $3, email = $4,
                created_at = $5, created_by = $6, updated_at = $7, updated_by = $8,
                started_at = $9, started_by = $10, start_date = $11, end_date = $12,
                completed_at = $13, completed_by = $14, content = $15
            WHERE uuid = $1
            "#,
            self.table()
        );
        bind_record(sqlx::query(&sql), record)?
            .execute(&mut **tx)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error(C::KIND, "write_row", e))
    }

    /// Read-modify-write under a row lock.
    async fn modify<T, F>(&self, operation: &'static str, uuid: &str, apply: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut Record<C>) -> T + Send,
        T: Send,
    {
        with_timeout(self.timeout, operation, async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "begin_transaction", e))?;

            let mut record = self.lock_row(&mut tx, uuid).await?;
            let out = apply(&mut record);
            self.write_row(&mut tx, &record).await?;

            tx.commit()
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "commit_transaction", e))?;
            Ok(out)
        })
        .await
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

/// Bind `$1..$15` in `COLUMNS` order.
fn bind_record<'q, C: Content>(query: PgQuery<'q>, record: &'q Record<C>) -> RepositoryResult<PgQuery<'q>> {
    let content = serde_json::to_value(&record.content)
        .map_err(|e| RepositoryError::storage(format!("encode content: {e}")))?;
    let dates = &record.metadata.dates;
    Ok(query
        .bind(&record.uuid)
        .bind(&record.id)
        .bind(&record.metadata.name)
        .bind(record.email())
        .bind(&dates.created_at)
        .bind(&dates.created_by)
        .bind(&dates.updated_at)
        .bind(&dates.updated_by)
        .bind(&dates.started_at)
        .bind(&dates.started_by)
        .bind(&dates.start_date)
        .bind(&dates.end_date)
        .bind(&dates.completed_at)
        .bind(&dates.completed_by)
        .bind(content))
}

#[async_trait]
impl<C: Content> Repository<C> for PostgresRepository<C> {
    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn list_ids_and_uuids(&self) -> RepositoryResult<Vec<IdUuid>> {
        let sql = format!("SELECT id, uuid FROM {}", self.table());
        with_timeout(self.timeout, "list_ids_and_uuids", async {
            let rows = sqlx::query(&sql)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "list_ids_and_uuids", e))?;
            rows.iter()
                .map(|row| -> Result<IdUuid, sqlx::Error> {
                    Ok(IdUuid::new(
                        row.try_get::<String, _>("id")?,
                        row.try_get::<String, _>("uuid")?,
                    ))
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(|e| map_sqlx_error(C::KIND, "decode_row", e))
        })
        .await
    }

    #[instrument(skip(self), fields(kind = %C::KIND, record_count = tracing::field::Empty), err)]
    async fn list(&self) -> RepositoryResult<Vec<Record<C>>> {
        let sql = format!("SELECT {COLUMNS} FROM {}", self.table());
        let records = with_timeout(self.timeout, "list", async {
            let rows = sqlx::query(&sql)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "list", e))?;
            let mut records = Vec::with_capacity(rows.len());
            for row in &rows {
                let row = RecordRow::from_row(row)
                    .map_err(|e| map_sqlx_error(C::KIND, "decode_row", e))?;
                records.push(row.into_record::<C>()?);
            }
            Ok(records)
        })
        .await?;

        Span::current().record("record_count", records.len());
        Ok(records)
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn get(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        self.fetch_one_by("uuid", uuid).await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn get_by_id(&self, id: &str) -> RepositoryResult<Record<C>> {
        self.fetch_one_by("id", id).await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn get_by_name(&self, name: &str) -> RepositoryResult<Record<C>> {
        self.fetch_one_by("name", name).await
    }

    #[instrument(skip(self), fields(kind = %C::KIND), err)]
    async fn get_by_email(&self, email: &str) -> RepositoryResult<Record<C>> {
        self.fetch_one_by("email", email).await
    }

    #[instrument(skip(self, request), fields(kind = %C::KIND, id = %request.id), err)]
    async fn create(&self, request: CreateRequest<C>) -> RepositoryResult<Record<C>> {
        let uuid = resolve_uuid(&request.uuid)?;
        let record = request.into_record(uuid);
        let sql = format!(
            "INSERT INTO {} ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            self.table()
        );

        with_timeout(self.timeout, "create", async {
            bind_record(sqlx::query(&sql), &record)?
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
            "DELETE FROM {} WHERE uuid = $1 RETURNING {COLUMNS}",
            self.table()
        );
        with_timeout(self.timeout, "delete", async {
            let row = sqlx::query(&sql)
                .bind(uuid)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(C::KIND, "delete", e))?
                .ok_or(RepositoryError::NotFound(C::KIND))?;
            RecordRow::from_row(&row)
                .map_err(|e| map_sqlx_error(C::KIND, "decode_row", e))?
                .into_record::<C>()
        })
        .await
    }

    async fn health_check(&self) -> RepositoryResult<()> {
        ping(&self.pool, self.timeout, C::KIND).await
    }
}

pub(crate) async fn ping(pool: &PgPool, timeout: Duration, kind: EntityKind) -> RepositoryResult<()> {
    with_timeout(timeout, "health_check", async {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error(kind, "health_check", e))
    })
    .await
}

/// Map SQLx errors onto the repository taxonomy.
pub(crate) fn map_sqlx_error(kind: EntityKind, operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::already_exists(kind, msg),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound(kind),
        sqlx::Error::PoolTimedOut => {
            RepositoryError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::Io(e) => RepositoryError::Unavailable(format!("io error in {}: {}", operation, e)),
        other => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, other)),
    }
}

// SQLx row types

struct RecordRow {
    uuid: String,
    id: String,
    name: String,
    dates: CommonDate,
    content: serde_json::Value,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for RecordRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(RecordRow {
            uuid: row.try_get("uuid")?,
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            dates: CommonDate {
                created_at: row.try_get("created_at")?,
                created_by: row.try_get("created_by")?,
                updated_at: row.try_get("updated_at")?,
                updated_by: row.try_get("updated_by")?,
                started_at: row.try_get("started_at")?,
                started_by: row.try_get("started_by")?,
                start_date: row.try_get("start_date")?,
                end_date: row.try_get("end_date")?,
                completed_at: row.try_get("completed_at")?,
                completed_by: row.try_get("completed_by")?,
            },
            content: row.try_get("content")?,
        })
    }
}

impl RecordRow {
    fn into_record<C: Content>(self) -> RepositoryResult<Record<C>> {
        let content = serde_json::from_value(self.content).map_err(|e| {
            RepositoryError::storage(format!("decode {} content {}: {e}", C::KIND, self.uuid))
        })?;
        Ok(Record {
            id: self.id,
            uuid: self.uuid,
            metadata: Metadata {
                name: self.name,
                dates: self.dates,
            },
            content,
        })
    }
}

