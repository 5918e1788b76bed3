//! Service error model.

use thiserror::Error;

use crate::entity::EntityKind;

/// Result type used by the entity service and everything above it.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level error.
///
/// Transports map these onto their own status codes; nothing upstream should
/// inspect the message text to tell variants apart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No live record matched the requested key.
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// A record with the same name, email, ID or UUID already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was malformed (e.g. an unparseable UUID).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The storage backend could not be reached or timed out.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl ServiceError {
    pub fn not_found(kind: EntityKind) -> Self {
        Self::NotFound(kind)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
