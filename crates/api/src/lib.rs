//! HTTP API: router, auth guard and request/response mapping for the
//! user and team resources.

pub mod app;
pub mod context;
pub mod middleware;
