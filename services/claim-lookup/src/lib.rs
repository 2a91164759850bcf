pub mod config;
pub mod lookup;
pub mod routes;
pub mod source;

use std::any::Any;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::lookup::{ClaimLookupService, DECODE_FAILED_BODY};

/// Shared, read-only request state.
pub struct AppState {
    pub lookup: ClaimLookupService,
}

impl AppState {
    pub fn new(source: Arc<dyn source::ClaimSource>) -> Arc<Self> {
        Arc::new(Self {
            lookup: ClaimLookupService::new(source),
        })
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full Axum router for the lookup service.
/// Used by main.rs and integration tests.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .merge(routes::router())
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

/// A panicking handler still answers with the generic decode failure.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(%detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, DECODE_FAILED_BODY).into_response()
}
