//! Upstream retrieval abstraction so the scheduler and validator never see
//! transport details (C1).

use super::auth::AuthMode;
use super::rate_limit::{Backoff, RateLimitStatus};
use super::ssrf::assert_not_blocked;
use crate::errors::{CoreError, Result};
use crate::types::UpstreamSignals;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A discovered candidate document, paginated by an opaque cursor.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub repo_id: String,
    pub path: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchCursor(pub Option<String>);

#[derive(Debug, Clone)]
pub struct CandidatePage {
    pub candidates: Vec<Candidate>,
    pub next_cursor: SearchCursor,
}

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub upstream_revision: String,
    pub signals: UpstreamSignals,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub topic_tags: Vec<String>,
    pub filename_patterns: Vec<String>,
}

/// Abstracts the upstream provider so callers are never coupled to a
/// specific transport (spec §4.1).
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    async fn search_candidates(&self, filters: &SearchFilters, cursor: SearchCursor) -> Result<CandidatePage>;
    async fn fetch_document(&self, repo_id: &str, path: &str, revision: Option<&str>) -> Result<FetchedDocument>;
    async fn get_rate_limit(&self) -> Result<RateLimitStatus>;
}

pub struct GitHubProvider {
    http: Client,
    auth: AuthMode,
    exchanged_token: Option<String>,
    backoff: Backoff,
}

impl GitHubProvider {
    pub fn new(auth: AuthMode) -> Self {
        Self {
            http: Client::builder().timeout(Duration::from_secs(30)).build().expect("reqwest client"),
            auth,
            exchanged_token: None,
            backoff: Backoff::default(),
        }
    }

    /// Sets the already-exchanged installation token (exchange itself is
    /// out of this crate's scope, per spec non-goals on provider plumbing).
    pub fn with_exchanged_token(mut self, token: String) -> Self {
        self.exchanged_token = Some(token);
        self
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth.bearer_token(self.exchanged_token.as_deref()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_with_retry(&self, url: Url) -> Result<reqwest::Response> {
        assert_not_blocked(&url).await?;

        let mut attempt = 0u32;
        loop {
            let response = self.authorize(self.http.get(url.clone())).send().await;
            match response {
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS || resp.status() == reqwest::StatusCode::FORBIDDEN => {
                    match self.backoff.delay_for(attempt) {
                        Some(delay) => {
                            tracing::warn!(attempt, status = %resp.status(), "rate limited, backing off");
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        None => return Err(CoreError::RateLimited { reset_at: chrono::Utc::now() }),
                    }
                }
                Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => return Err(CoreError::NotFound),
                Ok(resp) if resp.status().is_server_error() => {
                    match self.backoff.delay_for(attempt) {
                        Some(delay) => {
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        None => return Err(CoreError::UpstreamUnavailable(resp.status().to_string())),
                    }
                }
                Ok(resp) => return Ok(resp),
                Err(_) if attempt < self.backoff.max_retries() => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                    continue;
                }
                Err(e) => return Err(CoreError::UpstreamUnavailable(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl UpstreamProvider for GitHubProvider {
    async fn search_candidates(&self, filters: &SearchFilters, cursor: SearchCursor) -> Result<CandidatePage> {
        let mut url = Url::parse("https://api.github.com/search/code").map_err(|e| CoreError::InvalidFilter(e.to_string()))?;
        {
            let mut q = url.query_pairs_mut();
            let query = format!(
                "filename:SKILL.md {} {}",
                filters.topic_tags.iter().map(|t| format!("topic:{t}")).collect::<Vec<_>>().join(" "),
                filters.filename_patterns.join(" "),
            );
            q.append_pair("q", query.trim());
            if let Some(page) = &cursor.0 {
                q.append_pair("page", page);
            }
        }
        let response = self.get_with_retry(url).await?;
        let body: serde_json::Value = response.json().await.map_err(|e| CoreError::UpstreamUnavailable(e.to_string()))?;

        let candidates = body["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(Candidate {
                            repo_id: item["repository"]["full_name"].as_str()?.to_string(),
                            path: item["path"].as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let next_cursor = cursor.0.as_deref().unwrap_or("1").parse::<u32>().ok().map(|p| (p + 1).to_string());
        Ok(CandidatePage { candidates, next_cursor: SearchCursor(next_cursor) })
    }

    async fn fetch_document(&self, repo_id: &str, path: &str, revision: Option<&str>) -> Result<FetchedDocument> {
        let raw_ref = revision.unwrap_or("HEAD");
        let url = Url::parse(&format!("https://raw.githubusercontent.com/{repo_id}/{raw_ref}/{path}"))
            .map_err(|e| CoreError::InvalidFilter(e.to_string()))?;
        let response = self.get_with_retry(url).await?;
        let bytes = response.bytes().await.map_err(|e| CoreError::UpstreamUnavailable(e.to_string()))?.to_vec();

        let meta_url = Url::parse(&format!("https://api.github.com/repos/{repo_id}")).map_err(|e| CoreError::InvalidFilter(e.to_string()))?;
        let meta_response = self.get_with_retry(meta_url).await?;
        let meta: serde_json::Value = meta_response.json().await.map_err(|e| CoreError::UpstreamUnavailable(e.to_string()))?;

        let signals = UpstreamSignals {
            stars: meta["stargazers_count"].as_u64().unwrap_or(0),
            forks: meta["forks_count"].as_u64().unwrap_or(0),
            watchers: meta["watchers_count"].as_u64().unwrap_or(0),
            last_updated: meta["pushed_at"].as_str().and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok()).map(|d| d.with_timezone(&chrono::Utc)),
            contributors: 0,
            license: meta["license"]["spdx_id"].as_str().map(String::from),
        };

        Ok(FetchedDocument { bytes, upstream_revision: raw_ref.to_string(), signals })
    }

    async fn get_rate_limit(&self) -> Result<RateLimitStatus> {
        let url = Url::parse("https://api.github.com/rate_limit").map_err(|e| CoreError::InvalidFilter(e.to_string()))?;
        let response = self.get_with_retry(url).await?;
        let body: serde_json::Value = response.json().await.map_err(|e| CoreError::UpstreamUnavailable(e.to_string()))?;
        let core = &body["resources"]["core"];
        Ok(RateLimitStatus {
            limit: core["limit"].as_u64().unwrap_or(60) as u32,
            remaining: core["remaining"].as_u64().unwrap_or(0) as u32,
            reset_at: core["reset"]
                .as_i64()
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                .unwrap_or_else(chrono::Utc::now),
            authenticated: self.auth.is_authenticated(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_defaults_to_none() {
        let cursor = SearchCursor::default();
        assert!(cursor.0.is_none());
    }

    #[tokio::test]
    async fn search_candidates_blocked_host_is_rejected() {
        let provider = GitHubProvider::new(AuthMode::Unauthenticated);
        // A loopback URL should never be reachable through this path.
        let url = Url::parse("https://127.0.0.1/search").unwrap();
        let err = provider.get_with_retry(url).await.unwrap_err();
        assert!(matches!(err, CoreError::BlockedHost));
    }
}
