use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use crate::app::services::AppServices;
use crate::context::PrincipalContext;

const HELLO: &str = "Hello, World!";

pub fn health_router() -> Router {
    Router::new()
        .route("/healthy", get(healthy))
        .route("/live", get(healthy))
        .route("/ready", get(ready))
}

pub fn hello_router() -> Router {
    Router::new()
        .route("/json", get(hello_json))
        .route("/string", get(hello_string))
}

pub async fn healthy() -> impl IntoResponse {
    Json(json!({ "status": "SERVING" }))
}

/// Serving only when every storage backend answers its health check.
pub async fn ready(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    match services.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "SERVING" }))),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "NOT_SERVING" })),
            )
        }
    }
}

pub async fn hello_json() -> impl IntoResponse {
    Json(json!({ "data": { "message": HELLO } }))
}

pub async fn hello_string() -> &'static str {
    HELLO
}

pub async fn profile(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(principal.principal().clone())
}
