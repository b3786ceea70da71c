//! Compose queries across the catalog and the local overlay, merge/rank/
//! dedupe, and return a bounded page (C7).
//!
//! A non-empty query text runs two legs concurrently over the merged
//! registry+local candidate set: `catalog::score_by_bm25` (the §4.6
//! name/description/author weighted lexical index) and
//! `catalog::score_by_vector` (cosine similarity against a query embedding
//! from `embedding::embed_text`). `search::fusion::reciprocal_rank_fusion`
//! then merges the two rank lists per spec §4.7. The vector leg runs under
//! `SEARCH_DEADLINE`; if it doesn't finish in time the lexical leg alone is
//! returned with `degraded=true`.

use crate::catalog::{filters_match, score_by_bm25, score_by_vector, tokenize, CatalogStore};
use crate::embedding::embed_text;
use crate::errors::{CoreError, Result};
use crate::quarantine::QuarantineStore;
use crate::search::fusion::reciprocal_rank_fusion;
use crate::types::{Query, ResultSource, SearchResponse, SearchResultItem, Skill};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;
const RRF_K: f32 = 60.0;
const CANDIDATE_POOL: usize = 200;
/// End-to-end search deadline (spec §4.7); the vector leg alone is allowed
/// to miss it, degrading to lexical-only results.
const SEARCH_DEADLINE: Duration = Duration::from_millis(500);

pub struct SearchEngine<'a> {
    catalog: &'a CatalogStore,
    quarantine: &'a QuarantineStore,
}

impl<'a> SearchEngine<'a> {
    pub fn new(catalog: &'a CatalogStore, quarantine: &'a QuarantineStore) -> Self {
        Self { catalog, quarantine }
    }

    /// `local_overlay` is the caller's already-discovered local skill set
    /// (spec §4.7's local-skill-directory indexer, out of this crate's
    /// scope — the caller supplies the result).
    pub async fn search(&self, query: &Query, local_overlay: &[Skill]) -> Result<SearchResponse> {
        let start = Instant::now();
        let text = query.text.as_deref().unwrap_or("").trim();
        if text.is_empty() && query.filters.is_empty() {
            return Err(CoreError::EmptyQuery);
        }
        if let Some(min_score) = query.filters.min_score {
            if min_score > 100 {
                return Err(CoreError::InvalidFilter("min_score must be in [0,100]".into()));
            }
        }
        if let Some(max_risk) = query.filters.max_risk {
            if !(0.0..=100.0).contains(&max_risk) {
                return Err(CoreError::InvalidFilter("max_risk must be in [0,100]".into()));
            }
        }

        let limit = if query.limit == 0 { DEFAULT_LIMIT } else { query.limit.min(MAX_LIMIT) };

        let candidates = self.catalog.filter_browse(&query.filters).await?;
        let merged = merge_overlay(candidates, local_overlay, &query.filters);

        let (ranked, degraded) = if text.is_empty() { (merged, false) } else { hybrid_rank(merged, text).await };

        let mut visible = Vec::with_capacity(ranked.len());
        for entry in ranked {
            if self.quarantine.is_quarantined(&entry.0.skill_id).await? {
                continue;
            }
            visible.push(entry);
        }

        let total = visible.len();
        let page: Vec<SearchResultItem> = visible
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .map(|(skill, source, score)| to_result_item(skill, source, score))
            .collect();

        Ok(SearchResponse { results: page, total, timing_ms: start.elapsed().as_millis() as u64, degraded })
    }
}

/// Local items whose `(author, name)` matches a registry item are dropped;
/// the registry record wins (spec §4.7's dedup rule).
fn merge_overlay(registry: Vec<Skill>, local: &[Skill], filters: &crate::types::Filters) -> Vec<(Skill, ResultSource, f64)> {
    let registry_ids: std::collections::HashSet<String> = registry.iter().map(|s| s.skill_id.clone()).collect();
    let mut out: Vec<(Skill, ResultSource, f64)> = registry.into_iter().map(|s| { let score = s.composite_score() as f64; (s, ResultSource::Registry, score) }).collect();
    for skill in local {
        if registry_ids.contains(&skill.skill_id) {
            continue;
        }
        if !filters_match(skill, filters) {
            continue;
        }
        let score = skill.composite_score() as f64;
        out.push((skill.clone(), ResultSource::Local, score));
    }
    out
}

/// Runs the lexical and vector legs concurrently and fuses them by
/// reciprocal rank (spec §4.7). A skill without a stored embedding still
/// participates in the vector leg: one is derived on the fly from its
/// name/description so local-overlay skills (which never pass through the
/// catalog's embedding pipeline) aren't invisible to semantic ranking.
async fn hybrid_rank(items: Vec<(Skill, ResultSource, f64)>, text: &str) -> (Vec<(Skill, ResultSource, f64)>, bool) {
    let mut by_id: HashMap<String, (Skill, ResultSource)> = HashMap::with_capacity(items.len());
    let mut skills: Vec<Skill> = Vec::with_capacity(items.len());
    for (skill, source, _) in items {
        by_id.insert(skill.skill_id.clone(), (skill.clone(), source));
        skills.push(skill);
    }

    let terms = tokenize(text);
    let lexical_fut = async { score_by_bm25(&skills, &terms).into_iter().map(|(s, score)| (s.skill_id, score)).collect::<Vec<_>>() };

    let vector_fut = async {
        let query_vector = embed_text(text);
        let embedded: Vec<Skill> = skills
            .iter()
            .cloned()
            .map(|mut s| {
                if s.embedding.is_none() {
                    s.embedding = Some(embed_text(&format!("{} {}", s.name, s.description)));
                }
                s
            })
            .collect();
        score_by_vector(&embedded, &query_vector).into_iter().map(|(s, score)| (s.skill_id, score)).collect::<Vec<_>>()
    };

    let (lexical_rank, vector_result) = tokio::join!(lexical_fut, tokio::time::timeout(SEARCH_DEADLINE, vector_fut));

    let (ranked_lists, degraded): (Vec<(&str, Vec<(String, f32)>)>, bool) = match vector_result {
        Ok(vector_rank) => (vec![("lexical", lexical_rank), ("vector", vector_rank)], false),
        Err(_elapsed) => (vec![("lexical", lexical_rank)], true),
    };

    let fused = reciprocal_rank_fusion(ranked_lists, RRF_K, by_id.len().min(CANDIDATE_POOL));
    let ranked = fused.into_iter().filter_map(|f| by_id.remove(&f.id).map(|(skill, source)| (skill, source, f.score as f64))).collect();
    (ranked, degraded)
}

fn to_result_item(skill: Skill, source: ResultSource, score: f64) -> SearchResultItem {
    SearchResultItem {
        skill_id: skill.skill_id,
        name: skill.name,
        description: skill.description,
        author: skill.author,
        trust_tier: skill.trust_tier,
        score,
        source,
        install_hint: skill.repository_url.clone(),
        compatibility: skill.compatibility,
        repository: skill.repository_url,
        highlights: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Filters, ScanStatus, SubScores, TrustTier, UpstreamSignals};
    use chrono::Utc;

    fn sample(author: &str, name: &str, description: &str, score: f64) -> Skill {
        Skill {
            skill_id: Skill::id_of(author, name),
            author: author.to_string(),
            name: name.to_string(),
            content_hash: "abc".into(),
            description: description.to_string(),
            tags: vec![],
            category: None,
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
    async fn empty_query_is_rejected() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let engine = SearchEngine::new(&catalog, &quarantine);
        let query = Query { text: None, filters: Filters::default(), limit: 20, offset: 0 };
        let err = engine.search(&query, &[]).await.unwrap_err();
        assert!(matches!(err, CoreError::EmptyQuery));
    }

    #[tokio::test]
    async fn filter_only_search_orders_by_score() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        catalog.upsert_skill(&sample("alice", "low", "a skill", 5.0)).await.unwrap();
        catalog.upsert_skill(&sample("bob", "high", "a skill", 25.0)).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let engine = SearchEngine::new(&catalog, &quarantine);
        let query = Query { text: None, filters: Filters { min_score: Some(0), ..Default::default() }, limit: 20, offset: 0 };
        let response = engine.search(&query, &[]).await.unwrap();
        assert_eq!(response.results[0].name, "high");
    }

    #[tokio::test]
    async fn quarantined_skill_is_never_returned() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let skill = sample("alice", "risky", "a skill", 10.0);
        catalog.upsert_skill(&skill).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        quarantine.create(&skill.skill_id, "finding", crate::types::Severity::High).await.unwrap();
        let engine = SearchEngine::new(&catalog, &quarantine);
        let query = Query { text: Some("skill".into()), filters: Default::default(), limit: 20, offset: 0 };
        let response = engine.search(&query, &[]).await.unwrap();
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn local_overlay_item_without_registry_counterpart_is_kept() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let engine = SearchEngine::new(&catalog, &quarantine);
        let local = sample("me", "my-local-skill", "does local things", 10.0);
        let query = Query { text: Some("local".into()), filters: Default::default(), limit: 20, offset: 0 };
        let response = engine.search(&query, std::slice::from_ref(&local)).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].source, ResultSource::Local);
    }

    #[tokio::test]
    async fn registry_item_wins_over_matching_local_item() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let registry_skill = sample("alice", "dup", "registry version", 10.0);
        catalog.upsert_skill(&registry_skill).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let engine = SearchEngine::new(&catalog, &quarantine);
        let local = sample("alice", "dup", "local version", 5.0);
        let query = Query { text: None, filters: Filters { min_score: Some(0), ..Default::default() }, limit: 20, offset: 0 };
        let response = engine.search(&query, std::slice::from_ref(&local)).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].source, ResultSource::Registry);
    }

    #[tokio::test]
    async fn text_search_matches_on_author() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let mut skill = sample("kubeexpert", "helper", "a generic assistant", 10.0);
        skill.author = "kubeexpert".into();
        catalog.upsert_skill(&skill).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let engine = SearchEngine::new(&catalog, &quarantine);
        let query = Query { text: Some("kubeexpert".into()), filters: Default::default(), limit: 20, offset: 0 };
        let response = engine.search(&query, &[]).await.unwrap();
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn text_search_is_not_degraded_under_normal_conditions() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        catalog.upsert_skill(&sample("alice", "kube-helper", "a skill for kubernetes", 10.0)).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let engine = SearchEngine::new(&catalog, &quarantine);
        let query = Query { text: Some("kubernetes".into()), filters: Default::default(), limit: 20, offset: 0 };
        let response = engine.search(&query, &[]).await.unwrap();
        assert!(!response.degraded);
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn text_search_finds_skill_by_stored_embedding_alone() {
        let catalog = CatalogStore::in_memory().await.unwrap();
        let mut skill = sample("alice", "container-tool", "kubernetes deployment helper", 10.0);
        skill.embedding = Some(crate::embedding::embed_text("kubernetes deployment helper"));
        catalog.upsert_skill(&skill).await.unwrap();
        let quarantine = QuarantineStore::in_memory().await.unwrap();
        let engine = SearchEngine::new(&catalog, &quarantine);
        let query = Query { text: Some("kubernetes deployment".into()), filters: Default::default(), limit: 20, offset: 0 };
        let response = engine.search(&query, &[]).await.unwrap();
        assert_eq!(response.results.len(), 1);
    }
}
