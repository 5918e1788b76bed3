//! Service wiring: picks a storage backend and optional cache from
//! [`Settings`] and hands out one [`EntityService`] per resource.
//!
//! ```text
//! STORAGE_BACKEND=memory    → InMemoryRepository
//! STORAGE_BACKEND=json      → JsonDirRepository  ($DATA_DIR/users, $DATA_DIR/teams)
//! STORAGE_BACKEND=postgres  → PostgresRepository (tables users, teams)
//! STORAGE_BACKEND=document  → DocumentRepository (tables user_documents, team_documents)
//!
//! CACHE_ENABLED=true        → one CacheStore shared by both services
//! ```

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use roster_core::{Content, ServiceResult, TeamContent, UserContent};
use roster_infra::repository::{
    DocumentRepository, InMemoryRepository, JsonDirRepository, PostgresRepository, Repository,
};
use roster_infra::{CacheBackend, CacheStore, EntityService, InMemoryCacheStore, Settings, StorageBackend};

#[derive(Clone)]
pub struct AppServices {
    pub users: EntityService<UserContent>,
    pub teams: EntityService<TeamContent>,
}

impl AppServices {
    /// In-memory storage, optionally with a process-local cache (dev/test).
    pub fn in_memory(cache: bool) -> Self {
        let mut users = EntityService::new(Arc::new(InMemoryRepository::<UserContent>::new()));
        let mut teams = EntityService::new(Arc::new(InMemoryRepository::<TeamContent>::new()));
        if cache {
            let store: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
            users = users.with_cache(store.clone());
            teams = teams.with_cache(store);
        }
        Self { users, teams }
    }

    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let (users, teams): (Arc<dyn Repository<UserContent>>, Arc<dyn Repository<TeamContent>>) =
            match settings.storage_backend {
                StorageBackend::Memory => (
                    Arc::new(InMemoryRepository::<UserContent>::new()),
                    Arc::new(InMemoryRepository::<TeamContent>::new()),
                ),
                StorageBackend::Json => (
                    Arc::new(JsonDirRepository::<UserContent>::open(settings.users_dir()).await?),
                    Arc::new(JsonDirRepository::<TeamContent>::open(settings.teams_dir()).await?),
                ),
                StorageBackend::Postgres => {
                    let pool = connect_pool(settings).await?;
                    (
                        relational::<UserContent>(&pool, settings).await?,
                        relational::<TeamContent>(&pool, settings).await?,
                    )
                }
                StorageBackend::Document => {
                    let pool = connect_pool(settings).await?;
                    (
                        document::<UserContent>(&pool, settings).await?,
                        document::<TeamContent>(&pool, settings).await?,
                    )
                }
            };

        let mut users = EntityService::new(users);
        let mut teams = EntityService::new(teams);
        if settings.cache_enabled {
            let store = build_cache(settings).await?;
            users = users.with_cache(store.clone());
            teams = teams.with_cache(store);
        }

        tracing::info!(
            storage = settings.storage_backend.as_str(),
            cache = settings.cache_enabled,
            "services initialized"
        );
        Ok(Self { users, teams })
    }

    /// Readiness of every backend the services depend on.
    pub async fn health_check(&self) -> ServiceResult<()> {
        self.users.health_check().await?;
        self.teams.health_check().await
    }
}

async fn connect_pool(settings: &Settings) -> anyhow::Result<PgPool> {
    let url = settings
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for database backends")?;
    PgPoolOptions::new()
        .acquire_timeout(settings.backend_timeout)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

async fn relational<C: Content>(
    pool: &PgPool,
    settings: &Settings,
) -> anyhow::Result<Arc<dyn Repository<C>>> {
    let repo = PostgresRepository::<C>::new(pool.clone()).with_timeout(settings.backend_timeout);
    repo.ensure_schema().await?;
    Ok(Arc::new(repo))
}

async fn document<C: Content>(
    pool: &PgPool,
    settings: &Settings,
) -> anyhow::Result<Arc<dyn Repository<C>>> {
    let repo = DocumentRepository::<C>::new(pool.clone()).with_timeout(settings.backend_timeout);
    repo.ensure_schema().await?;
    Ok(Arc::new(repo))
}

async fn build_cache(settings: &Settings) -> anyhow::Result<Arc<dyn CacheStore>> {
    match settings.cache_backend {
        CacheBackend::Memory => Ok(Arc::new(InMemoryCacheStore::new())),
        #[cfg(feature = "redis")]
        CacheBackend::Redis => {
            let store = roster_infra::cache::RedisCacheStore::connect(&settings.redis_url)
                .await
                .context("failed to connect to Redis")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => {
            anyhow::bail!("CACHE_BACKEND=redis requires building with the `redis` feature")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_backend_creates_resource_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            storage_backend: StorageBackend::Json,
            data_dir: tmp.path().to_path_buf(),
            ..Settings::default()
        };

        let services = AppServices::from_settings(&settings).await.unwrap();

        assert!(tmp.path().join("users").is_dir());
        assert!(tmp.path().join("teams").is_dir());
        assert!(!services.users.cache_enabled());
        services.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn cache_flag_wires_both_services() {
        let settings = Settings {
            cache_enabled: true,
            ..Settings::default()
        };
        let services = AppServices::from_settings(&settings).await.unwrap();
        assert!(services.users.cache_enabled());
        assert!(services.teams.cache_enabled());
    }
}
