//! Record identity: the `{ID, UUID}` pair and the UUID sentinel rule.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceError;

/// Identity projection returned by the enumeration endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdUuid {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "UUID", default)]
    pub uuid: String,
}

impl IdUuid {
    pub fn new(id: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: uuid.into(),
        }
    }
}

const SENTINELS: [&str; 3] = ["", "undefined", "null"];

/// Whether a caller-supplied UUID means "assign one for me".
pub fn is_sentinel_uuid(raw: &str) -> bool {
    let raw = raw.trim();
    if SENTINELS.contains(&raw) {
        return true;
    }
    Uuid::from_str(raw).map(|u| u.is_nil()).unwrap_or(false)
}

/// Check that a supplied UUID parses. The trimmed input is returned as
/// written, so lookups by the same string keep matching.
pub fn validate_uuid(raw: &str) -> Result<String, ServiceError> {
    let trimmed = raw.trim();
    Uuid::from_str(trimmed)
        .map(|_| trimmed.to_owned())
        .map_err(|e| ServiceError::invalid_input(format!("UUID '{raw}': {e}")))
}

/// Resolve the UUID for a new record.
///
/// Sentinels become a fresh v4 UUID; anything else must parse.
pub fn normalize_uuid(raw: &str) -> Result<String, ServiceError> {
    if is_sentinel_uuid(raw) {
        return Ok(Uuid::new_v4().hyphenated().to_string());
    }
    validate_uuid(raw)
}
