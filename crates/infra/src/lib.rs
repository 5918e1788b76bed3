//! Infrastructure layer: storage backends, cache, configuration and the
//! entity service that ties them together.

pub mod cache;
pub mod config;
pub mod repository;
pub mod service;

pub use cache::{CacheAside, CacheError, CacheStore, InMemoryCacheStore};
pub use config::{CacheBackend, ConfigError, Settings, StorageBackend};
pub use repository::{Repository, RepositoryError, RepositoryResult};
pub use service::{EntityService, ExistenceQuery};
