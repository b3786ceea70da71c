//! API request handlers - one per spec §6.3 tool-surface operation, plus
//! health/version.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::middleware::AppError;
use crate::types::*;
use crate::AppState;
use skillsmith_core::{
    AuthMode, Filters, GitHubProvider, Query as CoreQuery, RecommendationContext, SyncMode,
    SyncOptions, TrustTier,
};

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    debug!(?params, "search");

    let trust_tier = params
        .trust_tier
        .as_deref()
        .map(TrustTier::from_str)
        .transpose()
        .map_err(AppError::bad_request)?;

    let query = CoreQuery {
        text: params.text,
        filters: Filters {
            category: params.category,
            trust_tier,
            min_score: params.min_score,
            max_risk: params.max_risk,
            safe_only: params.safe_only,
            compatibility: None,
        },
        limit: params.limit,
        offset: params.offset,
    };

    let engine = skillsmith_core::SearchEngine::new(&state.stores.catalog, &state.stores.quarantine);
    let response = engine.search(&query, &[]).await?;
    Ok(Json(response))
}

pub async fn get_skill(
    State(state): State<Arc<AppState>>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let skill = state
        .stores
        .catalog
        .get_skill(&skill_id)
        .await?
        .ok_or_else(|| AppError::not_found(&format!("skill '{skill_id}'")))?;
    Ok(Json(skill))
}

pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecommendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = RecommendationContext {
        project_description: body.project_description,
        installed_skills: body.installed_skills.into_iter().collect(),
        role: body.role,
        stack: None,
    };
    let response = skillsmith_core::recommend::recommend(
        &state.stores.catalog,
        &state.stores.quarantine,
        &ctx,
        body.limit,
    )
    .await?;
    Ok(Json(response))
}

pub async fn compare(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CompareRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = skillsmith_core::compare(&state.stores.catalog, &body.skill_a, &body.skill_b).await?;
    Ok(Json(response))
}

pub async fn validate(Json(body): Json<ValidateRequest>) -> impl IntoResponse {
    use skillsmith_core::validate::{validate as run_validate, ValidationOptions};

    let options = ValidationOptions { strict: body.strict, ..ValidationOptions::default() };
    let response = match run_validate(body.content.as_bytes(), &options) {
        Ok(_) => ValidateResponse { valid: true, reasons: vec![] },
        Err(e) => ValidateResponse { valid: false, reasons: vec![e.to_string()] },
    };
    Json(response)
}

pub async fn suggest_install(
    State(state): State<Arc<AppState>>,
    Path(skill_id): Path<String>,
    Query(params): Query<SuggestInstallParams>,
) -> Result<impl IntoResponse, AppError> {
    let caller_trust = params
        .caller_trust
        .as_deref()
        .map(TrustTier::from_str)
        .transpose()
        .map_err(AppError::bad_request)?;

    let response = skillsmith_core::suggest_install::suggest_install(
        &state.stores.catalog,
        &state.stores.quarantine,
        &skill_id,
        caller_trust,
    )
    .await?;
    Ok(Json(response))
}

pub async fn sync(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SyncRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mode = match body.mode.as_deref() {
        Some("full") => SyncMode::Full,
        _ => SyncMode::Differential,
    };

    let auth = AuthMode::select(
        state.stores.config.auth.app_id.as_deref(),
        state.stores.config.auth.app_installation_id.as_deref(),
        state.stores.config.auth.app_private_key.as_deref(),
        state.stores.config.auth.personal_access_token.as_deref(),
    );
    let provider = GitHubProvider::new(auth);
    let options = SyncOptions { mode, dry_run: body.dry_run, ..SyncOptions::default() };

    let report = skillsmith_core::sync::sync(
        &provider,
        &state.stores.catalog,
        &state.stores.quarantine,
        &state.stores.audit,
        &state.stores.config.sync_state_path(),
        &options,
    )
    .await?;
    Ok(Json(report))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "ok".to_string(), uptime_secs: state.started_at.elapsed().as_secs() })
}

pub async fn version_info() -> impl IntoResponse {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() })
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ApiError::not_found("route")))
}
