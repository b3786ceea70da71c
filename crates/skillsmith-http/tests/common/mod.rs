//! Common test utilities for HTTP integration tests.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use skillsmith_core::{AuditLog, CatalogStore, CoreConfig, QuarantineStore};
use skillsmith_http::server::AppState;
use skillsmith_http::stores::Stores;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Test app wired to in-memory stores, no disk state shared across tests.
pub struct TestApp {
    pub state: Arc<AppState>,
    _tempdir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let tempdir = tempfile::tempdir().expect("failed to create tempdir");
        let catalog = CatalogStore::in_memory().await.expect("failed to open catalog");
        let quarantine = QuarantineStore::in_memory().await.expect("failed to open quarantine");
        let audit = AuditLog::open(&tempdir.path().join("audit.log")).expect("failed to open audit log");
        let stores = Stores { catalog, quarantine, audit, config: CoreConfig::default() };
        let state = Arc::new(AppState { started_at: std::time::Instant::now(), stores });

        Self { state, _tempdir: tempdir }
    }

    pub async fn request(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let app = skillsmith_http::routes::create_app(self.state.clone());
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    pub fn get_request(path: &str) -> Request<Body> {
        Request::builder().method("GET").uri(path).body(Body::empty()).unwrap()
    }

    pub fn post_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> T {
        serde_json::from_slice(body).expect("Failed to parse JSON response")
    }
}
