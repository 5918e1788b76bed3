//! Storage backends behind one repository contract.
//!
//! Every backend implements [`Repository`] for any [`roster_core::Content`]
//! type, so users and teams share the same storage code. Exactly one backend
//! is active per process; which one is a deployment-time choice made in the
//! binary's wiring.
//!
//! | Backend | Uniqueness enforced | Notes |
//! |---------|---------------------|-------|
//! | [`InMemoryRepository`] | `UUID` | tests and local runs |
//! | [`JsonDirRepository`] | `UUID` | one `<UUID>.json` file per record |
//! | [`PostgresRepository`] | `UUID`, `ID`, non-empty email | typed columns + JSONB content |
//! | [`DocumentRepository`] | `UUID`, `ID`, non-empty email | whole record as one JSONB document |

use std::future::Future;
use std::time::Duration;

pub mod document;
pub mod in_memory;
pub mod json_dir;
pub mod postgres;
pub mod r#trait;


pub use document::DocumentRepository;
pub use in_memory::InMemoryRepository;
pub use json_dir::JsonDirRepository;
pub use postgres::PostgresRepository;
pub use r#trait::{Repository, RepositoryError, RepositoryResult};

/// Default bound on a single network-backed storage call.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(3);

/// Run a backend call under `limit`; expiry becomes `Unavailable`.
pub(crate) async fn with_timeout<T, F>(
    limit: Duration,
    operation: &str,
    fut: F,
) -> RepositoryResult<T>
where
    F: Future<Output = RepositoryResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Unavailable(format!(
            "{operation} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

/// Resolve the UUID for a new record (sentinels get a fresh v4).
pub(crate) fn resolve_uuid(raw: &str) -> RepositoryResult<String> {
    roster_core::normalize_uuid(raw).map_err(|e| RepositoryError::Invalid(e.to_string()))
}
