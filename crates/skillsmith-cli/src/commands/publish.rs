//! `skillsmith publish` - validate, scan, score, and catalog a local skill
//! document (spec §6.4; the author-submitted counterpart to `sync`'s
//! upstream ingestion in `skillsmith_core::sync::ingest_one`).

use crate::stores::Stores;
use colored::Colorize;
use skillsmith_core::scoring::{self, DocumentationSignals, TrustSignals};
use skillsmith_core::validate::{validate, ValidationOptions};
use skillsmith_core::{scan, CoreError, ScanStatus, ScannerConfig, Severity, Skill, TrustTier, UpstreamSignals};
use chrono::Utc;

pub async fn execute(path: &std::path::Path, author: Option<String>, force: bool) -> Result<(), CoreError> {
    let bytes = std::fs::read(path).map_err(|e| CoreError::Validation(e.to_string()))?;
    let validated = validate(&bytes, &ValidationOptions::default())?;

    let author = author
        .or_else(|| validated.author.clone())
        .ok_or_else(|| CoreError::Validation("no author given and none found in frontmatter".into()))?;
    let skill_id = Skill::id_of(&author, &validated.name);

    let stores = Stores::open(None)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;

    let existing = stores.catalog.get_skill(&skill_id).await?;
    if existing.is_some() && !force {
        return Err(CoreError::Validation(format!(
            "{skill_id} already exists in the catalog; use --force to overwrite"
        )));
    }

    let scan_result = scan(&validated.body, &ScannerConfig::default(), TrustTier::Local.default_config());
    stores.audit.append(
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
    let sub_scores = scoring::compute_sub_scores(&UpstreamSignals::default(), &doc_signals, &trust_signals);

    let trust_tier = scoring::tier_after_scan(TrustTier::Local, scan_result.risk_score, scan_result.recommendation);
    let scan_status = match scan_result.recommendation {
        skillsmith_core::ScanRecommendation::Safe => ScanStatus::Safe,
        skillsmith_core::ScanRecommendation::Review => ScanStatus::Review,
        skillsmith_core::ScanRecommendation::Quarantine => ScanStatus::Quarantined,
    };

    let now = Utc::now();
    let content_hash = blake3::hash(validated.body.as_bytes()).to_hex().to_string();
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
        upstream_source_id: "local".to_string(),
        upstream_revision: "local".to_string(),
        size_bytes: validated.body.len() as u64,
        language: None,
        version: validated.version,
        compatibility: validated.compatibility,
        repository_url: None,
        signals: UpstreamSignals::default(),
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
        let severity = scan_result.findings.iter().map(|f| f.severity).max().unwrap_or(Severity::Medium);
        let entry = stores.quarantine.create(&skill_id, "scanner flagged this skill for review", severity).await?;
        stores.catalog.upsert_skill(&skill).await?;
        println!("{} {} quarantined (entry {})", "!".yellow(), skill_id, entry.id);
        return Err(CoreError::Quarantined { entry_id: entry.id });
    }

    stores.catalog.upsert_skill(&skill).await?;
    println!("{} Published {} (tier={}, score={})", "✓".green().bold(), skill_id, skill.trust_tier, skill.composite_score());
    Ok(())
}
