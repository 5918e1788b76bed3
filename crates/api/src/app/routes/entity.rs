//! One router for both resources. `/users` and `/teams` mount the same
//! handlers, instantiated for their content type.
//!
//! ```text
//! GET    /                  list                 {"users": [...]}
//! POST   /                  create               201 record
//! GET    /ids-and-uuids     list ID/UUID pairs   {"userIdUuids": [...]}
//! GET    /metadata          list metadata        {"userMetadataResponses": [...]}
//! GET    /content           list content         {"userContentResponses": [...]}
//! GET    /id/:id            get by ID
//! GET    /name/:name        get by name
//! GET    /email/:email      get by email
//! GET    /:uuid             get
//! PUT    /:uuid             update (path UUID wins over body UUID)
//! DELETE /:uuid             delete, returns the deleted record
//! GET    /:uuid/metadata    metadata projection
//! PUT    /:uuid/metadata    metadata-only update
//! GET    /:uuid/content     content projection
//! PUT    /:uuid/content     content-only update
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use roster_core::{
    Content, CreateRequest, ServiceResult, TeamContent, UpdateContentRequest,
    UpdateMetadataRequest, UpdateRequest, UserContent,
};
use roster_infra::EntityService;

use crate::app::dto::{self, ListNames};
use crate::app::errors;
use crate::app::services::AppServices;

/// A content type that is exposed as an HTTP resource.
pub trait Resource: Content + ListNames {
    fn service(services: &AppServices) -> &EntityService<Self>;
}

impl Resource for UserContent {
    fn service(services: &AppServices) -> &EntityService<Self> {
        &services.users
    }
}

impl Resource for TeamContent {
    fn service(services: &AppServices) -> &EntityService<Self> {
        &services.teams
    }
}

pub fn router<C: Resource>() -> Router {
    Router::new()
        .route("/", get(list::<C>).post(create::<C>))
        .route("/ids-and-uuids", get(list_ids_and_uuids::<C>))
        .route("/metadata", get(list_metadata::<C>))
        .route("/content", get(list_content::<C>))
        .route("/id/:id", get(get_by_id::<C>))
        .route("/name/:name", get(get_by_name::<C>))
        .route("/email/:email", get(get_by_email::<C>))
        .route("/:uuid", get(get_one::<C>).put(update::<C>).delete(delete::<C>))
        .route("/:uuid/metadata", get(get_metadata::<C>).put(update_metadata::<C>))
        .route("/:uuid/content", get(get_content::<C>).put(update_content::<C>))
}

fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn respond_list<T: Serialize>(key: &str, result: ServiceResult<Vec<T>>) -> Response {
    match result {
        Ok(items) => dto::wrapped_list(key, items),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list<C: Resource>(Extension(services): Extension<Arc<AppServices>>) -> Response {
    respond_list(C::RECORDS, C::service(&services).list().await)
}

pub async fn list_ids_and_uuids<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
) -> Response {
    respond_list(C::ID_UUIDS, C::service(&services).list_ids_and_uuids().await)
}

pub async fn list_metadata<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
) -> Response {
    respond_list(C::METADATA, C::service(&services).list_metadata().await)
}

pub async fn list_content<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
) -> Response {
    respond_list(C::CONTENT, C::service(&services).list_content().await)
}

pub async fn create<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreateRequest<C>>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    respond(StatusCode::CREATED, C::service(&services).create(request).await)
}

pub async fn get_one<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uuid): Path<String>,
) -> Response {
    respond(StatusCode::OK, C::service(&services).get(&uuid).await)
}

pub async fn get_by_id<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    respond(StatusCode::OK, C::service(&services).get_by_id(&id).await)
}

pub async fn get_by_name<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> Response {
    respond(StatusCode::OK, C::service(&services).get_by_name(&name).await)
}

pub async fn get_by_email<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> Response {
    respond(StatusCode::OK, C::service(&services).get_by_email(&email).await)
}

pub async fn update<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uuid): Path<String>,
    body: Result<Json<UpdateRequest<C>>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    respond(StatusCode::OK, C::service(&services).update(&uuid, request).await)
}

pub async fn delete<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uuid): Path<String>,
) -> Response {
    respond(StatusCode::OK, C::service(&services).delete(&uuid).await)
}

pub async fn get_metadata<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uuid): Path<String>,
) -> Response {
    respond(StatusCode::OK, C::service(&services).get_metadata(&uuid).await)
}

pub async fn update_metadata<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uuid): Path<String>,
    body: Result<Json<UpdateMetadataRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    respond(
        StatusCode::OK,
        C::service(&services).update_metadata(&uuid, request).await,
    )
}

pub async fn get_content<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uuid): Path<String>,
) -> Response {
    respond(StatusCode::OK, C::service(&services).get_content(&uuid).await)
}

pub async fn update_content<C: Resource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uuid): Path<String>,
    body: Result<Json<UpdateContentRequest<C>>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    respond(
        StatusCode::OK,
        C::service(&services).update_content(&uuid, request).await,
    )
}
