use core::fmt;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::dates::Metadata;
use crate::id::IdUuid;
use crate::request::{ContentResponse, MetadataResponse, UpdateRequest};

/// The entity types the service manages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Team,
}

impl EntityKind {
    /// Singular lower-case name, used for cache key prefixes and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Team => "team",
        }
    }

    /// Plural name, used for tables, directories and route prefixes.
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Team => "teams",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific payload of a record.
///
/// Implementors define how a partial update is folded into the stored value:
/// empty strings, empty lists and `None` in `patch` mean "keep what is stored".
pub trait Content:
    Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Contact email, one of the alternate lookup keys.
    fn email(&self) -> &str;

    fn merge(&mut self, patch: &Self);
}

/// A persisted entity: identity, metadata and type-specific content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record<C> {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub content: C,
}

impl<C: Content> Record<C> {
    pub fn kind(&self) -> EntityKind {
        C::KIND
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn email(&self) -> &str {
        self.content.email()
    }

    pub fn id_uuid(&self) -> IdUuid {
        IdUuid::new(self.id.clone(), self.uuid.clone())
    }

    pub fn metadata_response(&self) -> MetadataResponse {
        MetadataResponse {
            id: self.id.clone(),
            uuid: self.uuid.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn content_response(&self) -> ContentResponse<C> {
        ContentResponse {
            id: self.id.clone(),
            uuid: self.uuid.clone(),
            content: self.content.clone(),
        }
    }

    /// Fold an update request into this record. `UUID` never changes.
    pub fn apply_update(&mut self, patch: &UpdateRequest<C>) {
        self.metadata.merge(&patch.metadata);
        self.content.merge(&patch.content);
    }
}
