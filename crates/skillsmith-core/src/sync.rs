//! Differential refresh loop that re-pulls changed upstream entries (C9).
//!
//! Streams candidates through the ingestion pipeline
//! (`validate` → `scanner::scan` → `scoring`/`quarantine`), appending to the
//! audit log at every scan and tier transition, and persists a checkpoint
//! after each successful page so an interrupted sync can resume (spec §4.9).

use crate::audit::AuditLog;
use crate::catalog::CatalogStore;
use crate::errors::Result;
use crate::fetch::{SearchCursor, SearchFilters, UpstreamProvider};
use crate::quarantine::QuarantineStore;
use crate::scanner::{self, ScannerConfig};
use crate::scoring::{self, DocumentationSignals, TrustSignals};
use crate::types::{ScanStatus, Skill, TrustTier};
use crate::validate::{self, ValidationOptions};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Full,
    Differential,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncCheckpoint {
    pub cursor: Option<String>,
    pub last_sync_at: Option<chrono::DateTime<Utc>>,
}

impl SyncCheckpoint {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub errors: u64,
    pub duration_ms: u64,
}

pub struct SyncOptions {
    pub mode: SyncMode,
    pub dry_run: bool,
    pub filters: SearchFilters,
    pub validation: ValidationOptions,
    pub scanner: ScannerConfig,
    pub max_pages: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Differential,
            dry_run: false,
            filters: SearchFilters::default(),
            validation: ValidationOptions::default(),
            scanner: ScannerConfig::default(),
            max_pages: 50,
        }
    }
}

/// Run one sync pass, consuming upstream candidate pages until the provider
/// signals exhaustion or `max_pages` is hit.
pub async fn sync(
    provider: &dyn UpstreamProvider,
    catalog: &CatalogStore,
    quarantine: &QuarantineStore,
    audit: &AuditLog,
    checkpoint_path: &Path,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let start = Instant::now();
    let mut report = SyncReport::default();

    let mut checkpoint = if options.mode == SyncMode::Full { SyncCheckpoint::default() } else { SyncCheckpoint::load(checkpoint_path)? };
    let mut cursor = SearchCursor(checkpoint.cursor.clone());

    for _ in 0..options.max_pages {
        let page = match provider.search_candidates(&options.filters, cursor.clone()).await {
            Ok(page) => page,
            Err(e) => {
                report.errors += 1;
                audit.append("sync_page_failed", serde_json::json!({"error": e.to_string()}))?;
                break;
            }
        };

        if page.candidates.is_empty() {
            break;
        }

        for candidate in &page.candidates {
            match ingest_one(provider, catalog, quarantine, audit, candidate, options).await {
                Ok(Outcome::Added) => report.added += 1,
                Ok(Outcome::Updated) => report.updated += 1,
                Ok(Outcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    report.errors += 1;
                    audit.append(
                        "ingest_failed",
                        serde_json::json!({"repo_id": candidate.repo_id, "path": candidate.path, "error": e.to_string()}),
                    )?;
                }
            }
        }

        cursor = page.next_cursor;
        if !options.dry_run {
            checkpoint.cursor = cursor.0.clone();
            checkpoint.last_sync_at = Some(Utc::now());
            checkpoint.save(checkpoint_path)?;
        }

        if cursor.0.is_none() {
            break;
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    Ok(report)
}

enum Outcome {
    Added,
    Updated,
    Unchanged,
}

async fn ingest_one(
    provider: &dyn UpstreamProvider,
    catalog: &CatalogStore,
    quarantine: &QuarantineStore,
    audit: &AuditLog,
    candidate: &crate::fetch::Candidate,
    options: &SyncOptions,
) -> Result<Outcome> {
    let document = provider.fetch_document(&candidate.repo_id, &candidate.path, None).await?;

    let owner = candidate.repo_id.split('/').next().map(String::from);
    let validation_opts = ValidationOptions { upstream_owner: owner, ..options.validation };
    let validated = validate::validate(&document.bytes, &validation_opts)?;

    let author = validated.author.clone().unwrap_or_else(|| candidate.repo_id.clone());
    let skill_id = Skill::id_of(&author, &validated.name);

    let existing = catalog.get_skill(&skill_id).await?;
    let content_hash = blake3::hash(validated.body.as_bytes()).to_hex().to_string();
    if let Some(existing) = &existing {
        if existing.content_hash == content_hash && existing.upstream_revision == document.upstream_revision {
            return Ok(Outcome::Unchanged);
        }
    }

    let scan_result = scanner::scan(&validated.body, &options.scanner, TrustTier::Community.default_config());
    audit.append(
        "scan_completed",
        serde_json::json!({"skill_id": skill_id, "risk_score": scan_result.risk_score, "recommendation": format!("{:?}", scan_result.recommendation)}),
    )?;

    let doc_signals = DocumentationSignals {
        skill_md_length: validated.body.len(),
        has_readme: false,
        description_len: validated.description.len(),
        description_has_punctuation: validated.description.trim_end().ends_with(['.', '!', '?']),
        has_examples: !validated.examples.is_empty(),
    };
    let trust_signals = TrustSignals { verified_publisher: false, recognized_tags: scoring::recognized_tag_count(&validated.tags) };
    let sub_scores = scoring::compute_sub_scores(&document.signals, &doc_signals, &trust_signals);

    let initial_tier = existing.as_ref().map(|s| s.trust_tier).unwrap_or(TrustTier::Community);
    let trust_tier = scoring::tier_after_scan(initial_tier, scan_result.risk_score, scan_result.recommendation);
    if trust_tier != initial_tier {
        audit.append("tier_transition", serde_json::json!({"skill_id": skill_id, "from": format!("{initial_tier:?}"), "to": format!("{trust_tier:?}")}))?;
    }

    let scan_status = match scan_result.recommendation {
        crate::types::ScanRecommendation::Safe => ScanStatus::Safe,
        crate::types::ScanRecommendation::Review => ScanStatus::Review,
        crate::types::ScanRecommendation::Quarantine => ScanStatus::Quarantined,
    };

    let now = Utc::now();
    let skill = Skill {
        skill_id: skill_id.clone(),
        author,
        name: validated.name,
        content_hash,
        description: validated.description,
        tags: validated.tags,
        category: validated.category,
        triggers: validated.triggers,
        roles: Vec::new(),
        upstream_source_id: candidate.repo_id.clone(),
        upstream_revision: document.upstream_revision,
        size_bytes: validated.body.len() as u64,
        language: None,
        version: validated.version,
        compatibility: validated.compatibility,
        repository_url: Some(format!("https://github.com/{}", candidate.repo_id)),
        signals: document.signals,
        sub_scores,
        trust_tier,
        scan_status,
        risk_score: scan_result.risk_score,
        last_scan_at: Some(scan_result.timestamp),
        embedding: None,
        archived: false,
        created_at: existing.as_ref().map(|s| s.created_at).unwrap_or(now),
        updated_at: now,
    };

    if scan_status == ScanStatus::Quarantined {
        let severity = scan_result
            .findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(crate::types::Severity::Medium);
        quarantine.create(&skill_id, "scanner flagged this skill for review", severity).await?;
    }

    if !options.dry_run {
        catalog.upsert_skill(&skill).await?;
    }

    Ok(if existing.is_some() { Outcome::Updated } else { Outcome::Added })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{CandidatePage, FetchedDocument, RateLimitStatus};
    use crate::types::UpstreamSignals;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeProvider {
        pages: Mutex<Vec<CandidatePage>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UpstreamProvider for FakeProvider {
        async fn search_candidates(&self, _filters: &SearchFilters, _cursor: SearchCursor) -> Result<CandidatePage> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pages.lock().unwrap().get(idx).cloned().unwrap_or(CandidatePage { candidates: vec![], next_cursor: SearchCursor(None) }))
        }

        async fn fetch_document(&self, _repo_id: &str, _path: &str, _revision: Option<&str>) -> Result<FetchedDocument> {
            Ok(FetchedDocument {
                bytes: b"---\nname: demo-skill\ndescription: Demonstrates a clean ingested skill end to end\n---\n\n# Demo Skill\n\nDoes useful things reliably.\n".to_vec(),
                upstream_revision: "rev1".to_string(),
                signals: UpstreamSignals { stars: 10, license: Some("mit".into()), ..Default::default() },
            })
        }

        async fn get_rate_limit(&self) -> Result<RateLimitStatus> {
            Ok(RateLimitStatus { limit: 5000, remaining: 5000, reset_at: Utc::now(), authenticated: false })
        }
    }

    #[tokio::test]
    async fn sync_ingests_candidates_and_persists_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = CatalogStore::in_memory().await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let audit = AuditLog::open(&dir.path().join("chain.log")).unwrap();
        let checkpoint_path = dir.path().join("sync/state.json");

        let provider = FakeProvider {
            pages: Mutex::new(vec![CandidatePage {
                candidates: vec![crate::fetch::Candidate { repo_id: "alice/demo".into(), path: "SKILL.md".into() }],
                next_cursor: SearchCursor(None),
            }]),
            calls: AtomicUsize::new(0),
        };

        let report = sync(&provider, &catalog, &quarantine, &audit, &checkpoint_path, &SyncOptions::default()).await.unwrap();
        assert_eq!(report.added, 1);
        assert!(checkpoint_path.exists());

        let skill = catalog.get_skill("alice/demo-skill").await.unwrap();
        assert!(skill.is_some());
    }

    #[tokio::test]
    async fn unchanged_candidate_is_not_recounted_as_added() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = CatalogStore::in_memory().await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let audit = AuditLog::open(&dir.path().join("chain.log")).unwrap();
        let checkpoint_path = dir.path().join("sync/state.json");

        let make_provider = || FakeProvider {
            pages: Mutex::new(vec![CandidatePage {
                candidates: vec![crate::fetch::Candidate { repo_id: "alice/demo".into(), path: "SKILL.md".into() }],
                next_cursor: SearchCursor(None),
            }]),
            calls: AtomicUsize::new(0),
        };

        sync(&make_provider(), &catalog, &quarantine, &audit, &checkpoint_path, &SyncOptions::default()).await.unwrap();
        let report = sync(&make_provider(), &catalog, &quarantine, &audit, &checkpoint_path, &SyncOptions::default()).await.unwrap();
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.added, 0);
    }
}
