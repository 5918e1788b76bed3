//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend/cache selection and the per-resource entity services
//! - `routes/`: HTTP handlers (a generic entity router plus system endpoints)
//! - `dto.rs`: list response wrappers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use roster_auth::Hs256JwtValidator;
use roster_core::{TeamContent, UserContent};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(jwt_secret: &str, services: AppServices) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(jwt_secret));
    let auth_state = middleware::AuthState { jwt };
    let services = Arc::new(services);

    // Protected routes: require a valid bearer token.
    let protected = Router::new()
        .nest("/users", routes::entity::router::<UserContent>())
        .nest("/teams", routes::entity::router::<TeamContent>())
        .route("/auth/profile", get(routes::system::profile))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .nest("/health", routes::system::health_router())
        .nest("/hello", routes::system::hello_router())
        .merge(protected)
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)))
}
