//! Integration tests for the search/skill/health REST endpoints.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::TestApp;
use skillsmith_core::{ScanStatus, Skill, SubScores, TrustTier, UpstreamSignals};
use skillsmith_http::types::*;

fn sample_skill(skill_id: &str, trust_tier: TrustTier) -> Skill {
    Skill {
        skill_id: skill_id.to_string(),
        author: "test-author".to_string(),
        name: skill_id.to_string(),
        content_hash: "abc".into(),
        description: "a test skill".into(),
        tags: vec!["test".into()],
        category: Some("dev".into()),
        triggers: vec![],
        roles: vec![],
        upstream_source_id: format!("test-author/{skill_id}"),
        upstream_revision: "deadbeef".into(),
        size_bytes: 100,
        language: None,
        version: None,
        compatibility: None,
        repository_url: None,
        signals: UpstreamSignals::default(),
        sub_scores: SubScores { popularity: 5.0, activity: 0.0, documentation: 0.0, trust: 0.0 },
        trust_tier,
        scan_status: ScanStatus::Safe,
        risk_score: 0.0,
        last_scan_at: None,
        embedding: None,
        archived: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn insert_skill(app: &TestApp, skill_id: &str, trust_tier: TrustTier) {
    let skill = sample_skill(skill_id, trust_tier);
    app.state.stores.catalog.upsert_skill(&skill).await.expect("failed to seed skill");
}

#[tokio::test]
async fn search_rejects_empty_query() {
    let app = TestApp::new().await;
    let req = TestApp::get_request("/api/search");
    let (status, _body) = app.request(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_returns_200_with_empty_catalog() {
    let app = TestApp::new().await;
    let req = TestApp::get_request("/api/search?safe_only=true");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let response: skillsmith_core::SearchResponse = TestApp::parse_json(&body);
    assert_eq!(response.total, 0);
}

#[tokio::test]
async fn search_finds_seeded_skill() {
    let app = TestApp::new().await;
    insert_skill(&app, "test-skill", TrustTier::Community).await;

    let req = TestApp::get_request("/api/search?text=test");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let response: skillsmith_core::SearchResponse = TestApp::parse_json(&body);
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].skill_id, "test-skill");
}

#[tokio::test]
async fn search_rejects_unknown_trust_tier() {
    let app = TestApp::new().await;
    let req = TestApp::get_request("/api/search?trust_tier=bogus");
    let (status, _body) = app.request(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_skill_returns_404_for_missing_skill() {
    let app = TestApp::new().await;
    let req = TestApp::get_request("/api/skills/does-not-exist");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let err: ApiError = TestApp::parse_json(&body);
    assert_eq!(err.code, "NOT_FOUND");
}

#[tokio::test]
async fn get_skill_returns_seeded_skill() {
    let app = TestApp::new().await;
    insert_skill(&app, "test-skill", TrustTier::Curated).await;

    let req = TestApp::get_request("/api/skills/test-skill");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let skill: Skill = TestApp::parse_json(&body);
    assert_eq!(skill.skill_id, "test-skill");
    assert_eq!(skill.trust_tier, TrustTier::Curated);
}

#[tokio::test]
async fn suggest_install_allows_safe_skill() {
    let app = TestApp::new().await;
    insert_skill(&app, "test-skill", TrustTier::Curated).await;

    let req = TestApp::get_request("/api/skills/test-skill/suggest-install");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let response: skillsmith_core::SuggestInstallResponse = TestApp::parse_json(&body);
    assert!(response.allowed);
}

#[tokio::test]
async fn suggest_install_rejects_when_caller_trust_too_high() {
    let app = TestApp::new().await;
    insert_skill(&app, "test-skill", TrustTier::Community).await;

    let req = TestApp::get_request("/api/skills/test-skill/suggest-install?caller_trust=verified");
    let (status, body) = app.request(req).await;

    // Insufficient trust is reported alongside quarantine (spec §6.3): both
    // block installation pending a human decision.
    assert_eq!(status, StatusCode::CONFLICT);
    let err: ApiError = TestApp::parse_json(&body);
    assert_eq!(err.code, "QUARANTINED");
}

#[tokio::test]
async fn compare_requires_both_skills_to_exist() {
    let app = TestApp::new().await;
    insert_skill(&app, "skill-a", TrustTier::Community).await;

    let req = TestApp::post_request(
        "/api/compare",
        r#"{"skill_a": "skill-a", "skill_b": "does-not-exist"}"#,
    );
    let (status, _body) = app.request(req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validate_reports_malformed_frontmatter() {
    let app = TestApp::new().await;
    let req = TestApp::post_request(
        "/api/validate",
        r#"{"content": "no frontmatter here"}"#,
    );
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let response: ValidateResponse = TestApp::parse_json(&body);
    assert!(!response.valid);
    assert!(!response.reasons.is_empty());
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::new().await;
    let req = TestApp::get_request("/api/health");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = TestApp::parse_json(&body);
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn version_reports_crate_version() {
    let app = TestApp::new().await;
    let req = TestApp::get_request("/api/version");
    let (status, body) = app.request(req).await;

    assert_eq!(status, StatusCode::OK);
    let version: VersionResponse = TestApp::parse_json(&body);
    assert_eq!(version.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = TestApp::new().await;
    let req = TestApp::get_request("/api/nonexistent");
    let (status, _body) = app.request(req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
