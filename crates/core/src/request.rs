//! Inbound request and outbound projection shapes.

use serde::{Deserialize, Serialize};

use crate::dates::Metadata;
use crate::entity::{Content, Record};

/// Create a record. A sentinel `UUID` asks the backend to assign one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest<C> {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub content: C,
}

impl<C: Content> CreateRequest<C> {
    /// Materialize the record with an already-resolved UUID.
    pub fn into_record(self, uuid: String) -> Record<C> {
        Record {
            id: self.id,
            uuid,
            metadata: self.metadata,
            content: self.content,
        }
    }
}

/// Full partial update. Blank fields keep the stored value; the path UUID wins
/// over the body `UUID`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest<C> {
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub content: C,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMetadataRequest {
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateContentRequest<C> {
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    #[serde(default)]
    pub content: C,
}

/// `{ID, UUID, metadata}` projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataResponse {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub metadata: Metadata,
}

/// `{ID, UUID, content}` projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentResponse<C> {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub content: C,
}
