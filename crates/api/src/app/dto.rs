//! Response wrappers for list endpoints.
//!
//! Single-record endpoints return the record or projection directly; lists
//! are wrapped in an object keyed by the resource-specific name, e.g.
//! `{"userIdUuids": [...]}` or `{"teamMetadataResponses": [...]}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use roster_core::{TeamContent, UserContent};

use crate::app::errors;

/// Wrapper keys for one resource's list responses.
pub trait ListNames {
    const ID_UUIDS: &'static str;
    const RECORDS: &'static str;
    const METADATA: &'static str;
    const CONTENT: &'static str;
}

impl ListNames for UserContent {
    const ID_UUIDS: &'static str = "userIdUuids";
    const RECORDS: &'static str = "users";
    const METADATA: &'static str = "userMetadataResponses";
    const CONTENT: &'static str = "userContentResponses";
}

impl ListNames for TeamContent {
    const ID_UUIDS: &'static str = "teamIdUuids";
    const RECORDS: &'static str = "teams";
    const METADATA: &'static str = "teamMetadataResponses";
    const CONTENT: &'static str = "teamContentResponses";
}

/// `200 {"<key>": items}`.
pub fn wrapped_list<T: Serialize>(key: &str, items: Vec<T>) -> Response {
    match serde_json::to_value(items) {
        Ok(items) => {
            let mut body = serde_json::Map::new();
            body.insert(key.to_owned(), items);
            (StatusCode::OK, axum::Json(serde_json::Value::Object(body))).into_response()
        }
        Err(e) => errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string()),
    }
}
