//! Head-to-head comparison between two catalog skills (spec §6.3 `compare`).

use crate::catalog::CatalogStore;
use crate::errors::{CoreError, Result};
use crate::types::{CompareDifference, CompareResponse, CompareWinner, Skill};

pub async fn compare(catalog: &CatalogStore, skill_a: &str, skill_b: &str) -> Result<CompareResponse> {
    if skill_a == skill_b {
        return Err(CoreError::IdenticalIds);
    }

    let a = catalog.get_skill(skill_a).await?.ok_or(CoreError::NotFound)?;
    let b = catalog.get_skill(skill_b).await?.ok_or(CoreError::NotFound)?;

    let differences = diff(&a, &b);
    let score_a = a.composite_score();
    let score_b = b.composite_score();
    let winner = match score_a.cmp(&score_b) {
        std::cmp::Ordering::Greater => CompareWinner::A,
        std::cmp::Ordering::Less => CompareWinner::B,
        std::cmp::Ordering::Equal => CompareWinner::Tie,
    };
    let recommendation = recommendation_for(&a, &b, winner);

    Ok(CompareResponse { a, b, differences, winner, recommendation, timing_ms: 0 })
}

fn diff(a: &Skill, b: &Skill) -> Vec<CompareDifference> {
    let mut out = Vec::new();

    if a.trust_tier != b.trust_tier {
        out.push(CompareDifference {
            dimension: "trust_tier".to_string(),
            a: format!("{:?}", a.trust_tier),
            b: format!("{:?}", b.trust_tier),
        });
    }
    if a.scan_status != b.scan_status {
        out.push(CompareDifference {
            dimension: "scan_status".to_string(),
            a: format!("{:?}", a.scan_status),
            b: format!("{:?}", b.scan_status),
        });
    }
    if a.composite_score() != b.composite_score() {
        out.push(CompareDifference {
            dimension: "composite_score".to_string(),
            a: a.composite_score().to_string(),
            b: b.composite_score().to_string(),
        });
    }
    if a.category != b.category {
        out.push(CompareDifference {
            dimension: "category".to_string(),
            a: a.category.clone().unwrap_or_default(),
            b: b.category.clone().unwrap_or_default(),
        });
    }
    if a.signals.stars != b.signals.stars {
        out.push(CompareDifference {
            dimension: "stars".to_string(),
            a: a.signals.stars.to_string(),
            b: b.signals.stars.to_string(),
        });
    }

    out
}

fn recommendation_for(a: &Skill, b: &Skill, winner: CompareWinner) -> String {
    match winner {
        CompareWinner::A => format!("{} scores higher ({} vs {})", a.skill_id, a.composite_score(), b.composite_score()),
        CompareWinner::B => format!("{} scores higher ({} vs {})", b.skill_id, b.composite_score(), a.composite_score()),
        CompareWinner::Tie => "both skills score equally; pick by category fit".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScanStatus, SubScores, TrustTier, UpstreamSignals};
    use chrono::Utc;

    fn sample(author: &str, name: &str, score: f64) -> Skill {
        Skill {
            skill_id: Skill::id_of(author, name),
            author: author.to_string(),
            name: name.to_string(),
            content_hash: "abc".into(),
            description: "a skill".into(),
            tags: vec![],
            category: Some("testing".into()),
            triggers: vec![],
            roles: vec![],
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
    async fn identical_ids_rejected() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let err = compare(&catalog, "alice/skill", "alice/skill").await;
        assert!(matches!(err, Err(CoreError::IdenticalIds)));
    }

    #[tokio::test]
    async fn missing_skill_is_not_found() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let a = sample("alice", "a", 10.0);
        catalog.upsert_skill(&a).await.unwrap();
        let err = compare(&catalog, &a.skill_id, "bob/missing").await;
        assert!(matches!(err, Err(CoreError::NotFound)));
    }

    #[tokio::test]
    async fn higher_score_wins() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let a = sample("alice", "strong", 90.0);
        let b = sample("bob", "weak", 10.0);
        catalog.upsert_skill(&a).await.unwrap();
        catalog.upsert_skill(&b).await.unwrap();
        let result = compare(&catalog, &a.skill_id, &b.skill_id).await.unwrap();
        assert_eq!(result.winner, CompareWinner::A);
        assert!(result.differences.iter().any(|d| d.dimension == "composite_score"));
    }

    #[tokio::test]
    async fn equal_score_is_tie() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let a = sample("alice", "a", 50.0);
        let b = sample("bob", "b", 50.0);
        catalog.upsert_skill(&a).await.unwrap();
        catalog.upsert_skill(&b).await.unwrap();
        let result = compare(&catalog, &a.skill_id, &b.skill_id).await.unwrap();
        assert_eq!(result.winner, CompareWinner::Tie);
    }
}
