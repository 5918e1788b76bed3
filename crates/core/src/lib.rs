//! `roster-core`: entity model shared by every layer.
//!
//! This crate holds the **pure model**: records, their metadata and content,
//! identifier rules and the service-level error taxonomy. No storage, cache or
//! transport concerns live here.

pub mod dates;
pub mod entity;
pub mod error;
pub mod id;
pub mod request;
pub mod team;
pub mod user;

pub use dates::{CommonDate, Metadata, now_rfc3339};
pub use entity::{Content, EntityKind, Record};
pub use error::{ServiceError, ServiceResult};
pub use id::{IdUuid, is_sentinel_uuid, normalize_uuid, validate_uuid};
pub use request::{
    ContentResponse, CreateRequest, MetadataResponse, UpdateContentRequest,
    UpdateMetadataRequest, UpdateRequest,
};
pub use team::{Team, TeamContent};
pub use user::{ProjectRole, ScrumRole, User, UserContent};
