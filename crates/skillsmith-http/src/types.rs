//! API request/response types for the HTTP transport (spec §6.3 tool
//! surface, rendered as REST). The response bodies are `skillsmith-core`'s
//! own structured records; this module only adds the request DTOs and the
//! shared error envelope.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Remediation hint, when one is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl From<&skillsmith_core::CoreError> for ApiError {
    fn from(err: &skillsmith_core::CoreError) -> Self {
        use skillsmith_core::ErrorKind;
        let code = match err.kind() {
            ErrorKind::Input => "INVALID_INPUT",
            ErrorKind::UpstreamTransient => "UPSTREAM_UNAVAILABLE",
            ErrorKind::UpstreamPermanent => "NOT_FOUND",
            ErrorKind::Policy => "POLICY_VIOLATION",
            ErrorKind::Quarantine => "QUARANTINED",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Concurrency => "INVALID_STATE",
        };
        let mut api_err = Self::new(code, err.to_string());
        if let Some(hint) = err.remediation_hint() {
            api_err = api_err.with_hint(hint);
        }
        api_err
    }
}

/// `GET /api/search` query parameters (spec §6.3 `search`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SearchParams {
    pub text: Option<String>,
    pub category: Option<String>,
    pub trust_tier: Option<String>,
    pub min_score: Option<u32>,
    pub safe_only: Option<bool>,
    pub max_risk: Option<f64>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// `POST /api/recommend` body (spec §6.3 `recommend`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecommendRequest {
    pub role: Option<String>,
    pub project_description: Option<String>,
    #[serde(default)]
    pub installed_skills: Vec<String>,
    #[serde(default = "default_recommend_limit")]
    pub limit: usize,
}

fn default_recommend_limit() -> usize {
    5
}

/// `POST /api/compare` body (spec §6.3 `compare`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CompareRequest {
    pub skill_a: String,
    pub skill_b: String,
}

/// `POST /api/validate` body (spec §6.3 `validate`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ValidateRequest {
    pub content: String,
    #[serde(default)]
    pub strict: bool,
}

/// `POST /api/validate` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub reasons: Vec<String>,
}

/// `GET /api/skills/:skill_id/suggest-install` query parameters (spec §6.3
/// `suggest-install`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SuggestInstallParams {
    pub caller_trust: Option<String>,
}

/// `POST /api/sync` body (spec §6.3 `sync`).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SyncRequest {
    pub mode: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// `GET /api/health` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

/// `GET /api/version` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VersionResponse {
    pub version: String,
}
