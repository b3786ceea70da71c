//! Contextual candidate scoring using project stack, installed set, and
//! role (C8).

use crate::catalog::CatalogStore;
use crate::quarantine::QuarantineStore;
use crate::errors::Result;
use crate::types::{RecommendResponse, Recommendation, RecommendationContext, Skill};
use std::collections::HashSet;

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 20;
const ROLE_BONUS: i64 = 30;
const OVERLAP_JACCARD_THRESHOLD: f64 = 0.5;

pub async fn recommend(
    catalog: &CatalogStore,
    quarantine: &QuarantineStore,
    ctx: &RecommendationContext,
    limit: usize,
) -> Result<RecommendResponse> {
    let limit = if limit == 0 { DEFAULT_LIMIT } else { limit.min(MAX_LIMIT) };

    let candidates = catalog.all_active().await?;
    let candidates_considered = candidates.len();

    let installed_triggers: HashSet<String> = candidates
        .iter()
        .filter(|s| ctx.installed_skills.contains(&s.skill_id))
        .flat_map(|s| s.triggers.iter().cloned())
        .collect();

    let mut overlap_filtered = 0usize;
    let mut role_filtered = 0usize;
    let mut scored = Vec::new();

    for skill in candidates {
        if ctx.installed_skills.contains(&skill.skill_id) {
            continue;
        }
        if quarantine.is_quarantined(&skill.skill_id).await? {
            continue;
        }
        if trigger_overlap(&skill.triggers, &installed_triggers) > OVERLAP_JACCARD_THRESHOLD {
            overlap_filtered += 1;
            continue;
        }

        let mut score = skill.composite_score() as i64;
        let mut matched_role = false;
        if let Some(role) = &ctx.role {
            if skill.roles.iter().any(|r| r.eq_ignore_ascii_case(role)) {
                score += ROLE_BONUS;
                matched_role = true;
            } else {
                role_filtered += 1;
            }
        }
        score += stack_bonus(&skill, ctx);

        scored.push((skill, score, matched_role));
    }

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.skill_id.cmp(&b.0.skill_id)));
    scored.truncate(limit);

    let recommendations = scored
        .into_iter()
        .map(|(skill, score, matched_role)| Recommendation {
            skill_id: skill.skill_id,
            reason: reason_for(matched_role, score),
            quality_score: score.clamp(0, 100) as u32,
            roles: skill.roles,
        })
        .collect();

    Ok(RecommendResponse { recommendations, candidates_considered, overlap_filtered, role_filtered, degraded: false })
}

fn trigger_overlap(candidate: &[String], installed: &HashSet<String>) -> f64 {
    if candidate.is_empty() || installed.is_empty() {
        return 0.0;
    }
    let candidate_set: HashSet<&String> = candidate.iter().collect();
    let intersection = candidate_set.iter().filter(|t| installed.contains(t.as_str())).count();
    let union = candidate_set.len() + installed.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Bucketed bonus for stack-keyword matches in name/description/tags.
fn stack_bonus(skill: &Skill, ctx: &RecommendationContext) -> i64 {
    let Some(stack) = &ctx.stack else { return 0 };
    let haystack = format!("{} {} {}", skill.name, skill.description, skill.tags.join(" ")).to_lowercase();
    let keywords = stack.frameworks.iter().chain(stack.languages.iter()).chain(stack.dependencies.iter());
    let matches = keywords.filter(|k| haystack.contains(&k.to_lowercase())).count();
    match matches {
        0 => 0,
        1 => 5,
        2 => 10,
        _ => 15,
    }
}

fn reason_for(matched_role: bool, score: i64) -> String {
    if matched_role {
        "matches the declared role and scores well on quality".to_string()
    } else {
        format!("quality score {score}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScanStatus, Stack, SubScores, TrustTier, UpstreamSignals};
    use chrono::Utc;

    fn sample(author: &str, name: &str, score: f64, triggers: Vec<&str>, roles: Vec<&str>) -> Skill {
        Skill {
            skill_id: Skill::id_of(author, name),
            author: author.to_string(),
            name: name.to_string(),
            content_hash: "abc".into(),
            description: "a skill".into(),
            tags: vec!["react".into()],
            category: None,
            triggers: triggers.into_iter().map(String::from).collect(),
            roles: roles.into_iter().map(String::from).collect(),
            upstream_source_id: format!("{author}/{name}"),
            upstream_revision: "deadbeef".into(),
            size_bytes: 100,
            language: None,
            version: None,
            compatibility: None,
            repository_url: None,
            signals: UpstreamSignals::default(),
            sub_scores: SubScores { popularity: score, activity: 0.0, documentation: 0.0, trust: 0.0 },
            trust_tier: TrustTier::Community,
            scan_status: ScanStatus::Safe,
            risk_score: 0.0,
            last_scan_at: None,
            embedding: None,
            archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn excludes_installed_skills() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let skill = sample("alice", "installed", 10.0, vec![], vec![]);
        catalog.upsert_skill(&skill).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let mut ctx = RecommendationContext::default();
        ctx.installed_skills.insert(skill.skill_id.clone());
        let response = recommend(&catalog, &quarantine, &ctx, 5).await.unwrap();
        assert!(response.recommendations.is_empty());
    }

    #[tokio::test]
    async fn excludes_high_trigger_overlap_with_installed() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let installed = sample("alice", "installed", 10.0, vec!["deploy", "k8s"], vec![]);
        let candidate = sample("bob", "candidate", 10.0, vec!["deploy", "k8s"], vec![]);
        catalog.upsert_skill(&installed).await.unwrap();
        catalog.upsert_skill(&candidate).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let mut ctx = RecommendationContext::default();
        ctx.installed_skills.insert(installed.skill_id.clone());
        let response = recommend(&catalog, &quarantine, &ctx, 5).await.unwrap();
        assert!(response.recommendations.iter().all(|r| r.skill_id != candidate.skill_id));
        assert_eq!(response.overlap_filtered, 1);
    }

    #[tokio::test]
    async fn role_match_gets_bonus_and_is_preferred_not_mandatory() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let matching = sample("alice", "matching", 10.0, vec![], vec!["backend"]);
        let other = sample("bob", "other", 10.0, vec![], vec!["frontend"]);
        catalog.upsert_skill(&matching).await.unwrap();
        catalog.upsert_skill(&other).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let ctx = RecommendationContext { role: Some("backend".into()), ..Default::default() };
        let response = recommend(&catalog, &quarantine, &ctx, 5).await.unwrap();
        assert_eq!(response.recommendations[0].skill_id, matching.skill_id);
        assert_eq!(response.recommendations.len(), 2, "non-matching role is filtered-noted, not excluded");
    }

    #[tokio::test]
    async fn stack_keyword_match_boosts_score() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let skill = sample("alice", "react-helper", 10.0, vec![], vec![]);
        catalog.upsert_skill(&skill).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let ctx = RecommendationContext {
            stack: Some(Stack { frameworks: vec!["react".into()], languages: vec![], dependencies: vec![] }),
            ..Default::default()
        };
        let response = recommend(&catalog, &quarantine, &ctx, 5).await.unwrap();
        assert!(response.recommendations[0].quality_score >= 10);
    }

    #[tokio::test]
    async fn quarantined_candidate_is_excluded() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let skill = sample("alice", "risky", 10.0, vec![], vec![]);
        catalog.upsert_skill(&skill).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        quarantine.create(&skill.skill_id, "finding", crate::types::Severity::Critical).await.unwrap();
        let response = recommend(&catalog, &quarantine, &RecommendationContext::default(), 5).await.unwrap();
        assert!(response.recommendations.is_empty());
    }
}
