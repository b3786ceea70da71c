//! Route table: the spec §6.3 tool surface, rendered as REST, plus
//! health/version and the OpenAPI document.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::handlers;
use crate::openapi::ApiDoc;
use crate::server::AppState;

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/search", get(handlers::search))
        .route("/api/skills/:skill_id", get(handlers::get_skill))
        .route("/api/skills/:skill_id/suggest-install", get(handlers::suggest_install))
        .route("/api/recommend", post(handlers::recommend))
        .route("/api/compare", post(handlers::compare))
        .route("/api/validate", post(handlers::validate))
        .route("/api/sync", post(handlers::sync))
        .route("/api/health", get(handlers::health_check))
        .route("/api/version", get(handlers::version_info))
        .route("/api/openapi.json", get(openapi_json))
        .fallback(handlers::not_found)
        .with_state(state)
}
