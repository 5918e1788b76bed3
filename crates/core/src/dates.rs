//! Audit timestamps and the metadata block shared by every entity type.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current UTC time as an RFC3339 string (second precision, `Z` suffix).
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Overwrite `target` only when `patch` carries a value.
pub(crate) fn overwrite(target: &mut String, patch: &str) {
    if !patch.is_empty() {
        *target = patch.to_owned();
    }
}

/// Audit and lifecycle timestamps.
///
/// All values are RFC3339 strings; the optional lifecycle fields are omitted
/// from JSON while empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonDate {
    pub created_at: String,
    pub created_by: String,
    pub updated_at: String,
    pub updated_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub started_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub started_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub start_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub end_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub completed_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub completed_by: String,
}

impl CommonDate {
    /// Apply a partial update. `created_at`/`created_by` are immutable here.
    pub fn merge(&mut self, patch: &CommonDate) {
        overwrite(&mut self.updated_at, &patch.updated_at);
        overwrite(&mut self.updated_by, &patch.updated_by);
        overwrite(&mut self.started_at, &patch.started_at);
        overwrite(&mut self.started_by, &patch.started_by);
        overwrite(&mut self.start_date, &patch.start_date);
        overwrite(&mut self.end_date, &patch.end_date);
        overwrite(&mut self.completed_at, &patch.completed_at);
        overwrite(&mut self.completed_by, &patch.completed_by);
    }

    /// Fill in creation stamps the caller left blank.
    pub fn stamp_created(&mut self, now: &str) {
        if self.created_at.is_empty() {
            self.created_at = now.to_owned();
        }
        if self.updated_at.is_empty() {
            self.updated_at = now.to_owned();
        }
        if self.updated_by.is_empty() && !self.created_by.is_empty() {
            self.updated_by = self.created_by.clone();
        }
    }
}

/// Name plus audit timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: String,
    pub dates: CommonDate,
}

impl Metadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dates: CommonDate::default(),
        }
    }

    pub fn merge(&mut self, patch: &Metadata) {
        overwrite(&mut self.name, &patch.name);
        self.dates.merge(&patch.dates);
    }

    /// Stamp `updatedAt`; `updatedBy` stays whatever the caller put there.
    pub fn stamp_updated(&mut self, now: &str) {
        self.dates.updated_at = now.to_owned();
    }
}
