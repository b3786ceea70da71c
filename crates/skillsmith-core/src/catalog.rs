//! Authoritative storage for skills, embeddings, and the local lexical index
//! (C6, spec §4.6).
//!
//! The catalog owns `Skill` records exclusively (spec §3). It stores the
//! full record as JSON alongside a handful of indexed columns used by
//! `filter_browse`, matching the quarantine store's row-plus-JSON-blob
//! shape in `quarantine.rs`. Writes are single-writer via the pool's
//! serialized SQLite connection; reads never block on ingest.
//!
//! Embeddings live in their own table, keyed one-to-one with `skills`
//! (at most one active embedding per skill, spec §4.6); `record_json` never
//! carries the embedding itself, so `upsert_skill` stays the single
//! transactional write path for `(skill, version, embedding)` without
//! duplicating the vector in two places.

use crate::embedding::cosine_similarity;
use crate::errors::Result;
use crate::types::{Filters, Skill, TrustTier};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;

/// Relative weights for the §4.6 weighted lexical fields: name outranks
/// description, which outranks author.
const NAME_WEIGHT: f32 = 3.0;
const DESCRIPTION_WEIGHT: f32 = 2.0;
const AUTHOR_WEIGHT: f32 = 1.0;

/// BM25 term-frequency saturation and length-normalization constants
/// (Robertson/Sparck Jones defaults).
const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub async fn open(path: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(path)
            .map_err(|e| crate::errors::CoreError::Storage(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(if path == "sqlite::memory:" { 1 } else { 5 })
            .connect_with(opts)
            .await?;
        let store = Self { pool };
        store.setup().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::open("sqlite::memory:").await
    }

    async fn setup(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS skills (
                skill_id TEXT PRIMARY KEY,
                author TEXT NOT NULL,
                name TEXT NOT NULL,
                category TEXT,
                trust_tier TEXT NOT NULL,
                composite_score INTEGER NOT NULL,
                popularity_score REAL NOT NULL,
                risk_score REAL NOT NULL,
                scan_status TEXT NOT NULL,
                archived INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                record_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE TABLE IF NOT EXISTS skill_versions (skill_id TEXT NOT NULL, version_label TEXT, upstream_revision TEXT NOT NULL, content_hash TEXT NOT NULL, indexed_at TEXT NOT NULL)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                skill_id TEXT PRIMARY KEY REFERENCES skills(skill_id),
                dim INTEGER NOT NULL,
                vector BLOB NOT NULL,
                model_id TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_skills_category ON skills(category)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_skills_tier ON skills(trust_tier)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Atomic upsert of the skill record, its version-history row, and its
    /// embedding (spec §4.6 transactional-at-skill-level write:
    /// `upsert_skill(skill, version, embedding?)`, where the version and
    /// embedding are carried on `skill` itself rather than as separate
    /// arguments, matching the single-record write path every other caller
    /// already uses).
    pub async fn upsert_skill(&self, skill: &Skill) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let mut record = skill.clone();
        record.embedding = None;

        sqlx::query(
            "INSERT INTO skills (skill_id, author, name, category, trust_tier, composite_score, popularity_score, risk_score, scan_status, archived, updated_at, record_json) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(skill_id) DO UPDATE SET \
             author = excluded.author, name = excluded.name, category = excluded.category, trust_tier = excluded.trust_tier, \
             composite_score = excluded.composite_score, popularity_score = excluded.popularity_score, risk_score = excluded.risk_score, \
             scan_status = excluded.scan_status, archived = excluded.archived, updated_at = excluded.updated_at, record_json = excluded.record_json",
        )
        .bind(&skill.skill_id)
        .bind(&skill.author)
        .bind(&skill.name)
        .bind(&skill.category)
        .bind(tier_str(skill.trust_tier))
        .bind(skill.composite_score() as i64)
        .bind(skill.sub_scores.popularity)
        .bind(skill.risk_score)
        .bind(scan_status_str(skill.scan_status))
        .bind(skill.archived as i64)
        .bind(skill.updated_at.to_rfc3339())
        .bind(serde_json::to_string(&record)?)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO skill_versions (skill_id, version_label, upstream_revision, content_hash, indexed_at) VALUES (?, ?, ?, ?, ?)")
            .bind(&skill.skill_id)
            .bind(&skill.version)
            .bind(&skill.upstream_revision)
            .bind(&skill.content_hash)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        match &skill.embedding {
            Some(vector) => {
                let bytes = bincode::serialize(vector).map_err(|e| crate::errors::CoreError::Storage(e.to_string()))?;
                sqlx::query(
                    "INSERT INTO embeddings (skill_id, dim, vector, model_id) VALUES (?, ?, ?, ?) \
                     ON CONFLICT(skill_id) DO UPDATE SET dim = excluded.dim, vector = excluded.vector, model_id = excluded.model_id",
                )
                .bind(&skill.skill_id)
                .bind(vector.len() as i64)
                .bind(bytes)
                .bind(crate::embedding::EMBEDDING_MODEL_ID)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM embeddings WHERE skill_id = ?").bind(&skill.skill_id).execute(&mut *tx).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_skill(&self, skill_id: &str) -> Result<Option<Skill>> {
        let row = sqlx::query("SELECT record_json FROM skills WHERE skill_id = ?")
            .bind(skill_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let mut skill = row_to_skill(&row)?;
        skill.embedding = self.load_embedding(skill_id).await?;
        Ok(Some(skill))
    }

    async fn load_embedding(&self, skill_id: &str) -> Result<Option<Vec<f32>>> {
        let row = sqlx::query("SELECT vector FROM embeddings WHERE skill_id = ?")
            .bind(skill_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| -> Result<Vec<f32>> {
            let bytes: Vec<u8> = r.try_get("vector")?;
            bincode::deserialize(&bytes).map_err(|e| crate::errors::CoreError::Storage(e.to_string()))
        })
        .transpose()
    }

    async fn load_all_embeddings(&self) -> Result<HashMap<String, Vec<f32>>> {
        let rows = sqlx::query("SELECT skill_id, vector FROM embeddings").fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| -> Result<(String, Vec<f32>)> {
                let skill_id: String = r.try_get("skill_id")?;
                let bytes: Vec<u8> = r.try_get("vector")?;
                let vector = bincode::deserialize(&bytes).map_err(|e| crate::errors::CoreError::Storage(e.to_string()))?;
                Ok((skill_id, vector))
            })
            .collect()
    }

    /// Soft delete: the record is retained (for the audit chain) but
    /// flagged archived, which excludes it from every browse/search path.
    pub async fn delete_skill(&self, skill_id: &str) -> Result<()> {
        sqlx::query("UPDATE skills SET archived = 1 WHERE skill_id = ?")
            .bind(skill_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn version_history(&self, skill_id: &str) -> Result<Vec<(Option<String>, String, String)>> {
        let rows = sqlx::query("SELECT version_label, upstream_revision, content_hash FROM skill_versions WHERE skill_id = ? ORDER BY indexed_at DESC")
            .bind(skill_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| -> Result<_> {
                Ok((r.try_get::<Option<String>, _>("version_label")?, r.try_get("upstream_revision")?, r.try_get("content_hash")?))
            })
            .collect::<Result<Vec<_>>>()?)
    }

    /// All skills not archived, ordered by composite score descending then
    /// the §4.6 tie-break chain. Quarantine exclusion happens at the
    /// search layer, which also has visibility into the quarantine store.
    pub async fn filter_browse(&self, filters: &Filters) -> Result<Vec<Skill>> {
        let rows = sqlx::query("SELECT record_json FROM skills WHERE archived = 0 ORDER BY composite_score DESC, popularity_score DESC, updated_at DESC, skill_id ASC")
            .fetch_all(&self.pool)
            .await?;
        let mut skills = rows.iter().map(row_to_skill).collect::<Result<Vec<_>>>()?;
        let embeddings = self.load_all_embeddings().await?;
        for skill in &mut skills {
            skill.embedding = embeddings.get(&skill.skill_id).cloned();
        }
        skills.retain(|s| filters_match(s, filters));
        Ok(skills)
    }

    pub async fn all_active(&self) -> Result<Vec<Skill>> {
        self.filter_browse(&Filters::default()).await
    }

    /// Nearest neighbors to `query_vector` by cosine similarity among skills
    /// matching `filters`, descending, bounded to `k` (spec §4.6
    /// `vector_search`). Skills with no stored embedding never match.
    pub async fn vector_search(&self, query_vector: &[f32], filters: &Filters, k: usize) -> Result<Vec<(Skill, f32)>> {
        let candidates = self.filter_browse(filters).await?;
        let mut scored = score_by_vector(&candidates, query_vector);
        scored.truncate(k);
        Ok(scored)
    }

    /// Weighted, paginated BM25-style lexical ranking over name (weight A),
    /// description (weight B), and author (weight C) (spec §4.6
    /// `lexical_search`).
    pub async fn lexical_search(&self, query: &str, filters: &Filters, offset: usize, limit: usize) -> Result<Vec<(Skill, f32)>> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = self.filter_browse(filters).await?;
        let scored = score_by_bm25(&candidates, &terms);
        Ok(scored.into_iter().skip(offset).take(limit).collect())
    }
}

/// Cosine similarity ranking over whatever embeddings `skills` carry,
/// descending. Shared by `CatalogStore::vector_search` and the search
/// engine's hybrid path so both legs score candidates identically.
pub fn score_by_vector(skills: &[Skill], query_vector: &[f32]) -> Vec<(Skill, f32)> {
    let mut scored: Vec<(Skill, f32)> = skills
        .iter()
        .filter_map(|s| s.embedding.as_deref().map(|v| (s.clone(), cosine_similarity(query_vector, v))))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase().split_whitespace().map(String::from).collect()
}

/// BM25F-style ranking over the name/description/author fields, weighted
/// per spec §4.6 (name > description > author). Field term frequencies are
/// combined with their weights before BM25 saturation, rather than scoring
/// each field independently, so a term repeated across fields compounds
/// once per document instead of three times.
pub fn score_by_bm25(skills: &[Skill], terms: &[String]) -> Vec<(Skill, f32)> {
    let n = skills.len() as f32;
    if n == 0.0 {
        return Vec::new();
    }

    struct Doc<'a> {
        skill: &'a Skill,
        weighted_tf: HashMap<&'a str, f32>,
        weighted_len: f32,
    }

    let docs: Vec<Doc> = skills
        .iter()
        .map(|skill| {
            let name_tokens = tokenize(&skill.name);
            let description_tokens = tokenize(&skill.description);
            let author_tokens = tokenize(&skill.author);
            let mut weighted_tf: HashMap<&str, f32> = HashMap::new();
            for term in terms {
                let tf = NAME_WEIGHT * count_matches(&name_tokens, term)
                    + DESCRIPTION_WEIGHT * count_matches(&description_tokens, term)
                    + AUTHOR_WEIGHT * count_matches(&author_tokens, term);
                if tf > 0.0 {
                    weighted_tf.insert(term.as_str(), tf);
                }
            }
            let weighted_len = NAME_WEIGHT * name_tokens.len() as f32
                + DESCRIPTION_WEIGHT * description_tokens.len() as f32
                + AUTHOR_WEIGHT * author_tokens.len() as f32;
            Doc { skill, weighted_tf, weighted_len }
        })
        .collect();

    let avg_len = (docs.iter().map(|d| d.weighted_len).sum::<f32>() / n).max(1.0);

    let idf: HashMap<&str, f32> = terms
        .iter()
        .map(|term| {
            let df = docs.iter().filter(|d| d.weighted_tf.contains_key(term.as_str())).count() as f32;
            (term.as_str(), ((n - df + 0.5) / (df + 0.5) + 1.0).ln())
        })
        .collect();

    let mut scored: Vec<(Skill, f32)> = docs
        .into_iter()
        .filter_map(|doc| {
            let score: f32 = doc
                .weighted_tf
                .iter()
                .map(|(term, tf)| {
                    let idf = idf.get(term).copied().unwrap_or(0.0);
                    idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc.weighted_len / avg_len))
                })
                .sum();
            (score > 0.0).then(|| (doc.skill.clone(), score))
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

fn count_matches(tokens: &[String], term: &str) -> f32 {
    tokens.iter().filter(|t| t.as_str() == term).count() as f32
}

pub fn filters_match(skill: &Skill, filters: &Filters) -> bool {
    if let Some(category) = &filters.category {
        if !skill.category.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(category)) {
            return false;
        }
    }
    if let Some(tier) = filters.trust_tier {
        if skill.trust_tier != tier {
            return false;
        }
    }
    if let Some(min_score) = filters.min_score {
        if skill.composite_score() < min_score {
            return false;
        }
    }
    if let Some(max_risk) = filters.max_risk {
        if skill.risk_score > max_risk {
            return false;
        }
    }
    if filters.safe_only == Some(true) && skill.scan_status != crate::types::ScanStatus::Safe {
        return false;
    }
    if let Some(requested) = &filters.compatibility {
        if let Some(declared) = &skill.compatibility {
            if !declared.intersects(requested) {
                return false;
            }
        }
    }
    true
}

fn tier_str(t: TrustTier) -> &'static str {
    match t {
        TrustTier::Verified => "verified",
        TrustTier::Curated => "curated",
        TrustTier::Community => "community",
        TrustTier::Experimental => "experimental",
        TrustTier::Unknown => "unknown",
        TrustTier::Local => "local",
    }
}

fn scan_status_str(s: crate::types::ScanStatus) -> &'static str {
    match s {
        crate::types::ScanStatus::Safe => "safe",
        crate::types::ScanStatus::Review => "review",
        crate::types::ScanStatus::Quarantined => "quarantined",
    }
}

fn row_to_skill(row: &sqlx::sqlite::SqliteRow) -> Result<Skill> {
    let json: String = row.try_get("record_json")?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScanStatus, SubScores, UpstreamSignals};
    use chrono::Utc;

    fn sample(author: &str, name: &str, score: f64) -> Skill {
        Skill {
            skill_id: Skill::id_of(author, name),
            author: author.to_string(),
            name: name.to_string(),
            content_hash: "abc".into(),
            description: "A sample skill for tests".into(),
            tags: vec!["rust".into()],
            category: Some("dev".into()),
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
    async fn upsert_and_get_roundtrips() {
        let store = CatalogStore::in_memory().await.unwrap();
        let skill = sample("alice", "kube-helper", 10.0);
        store.upsert_skill(&skill).await.unwrap();
        let fetched = store.get_skill(&skill.skill_id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "kube-helper");
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_skill_id() {
        let store = CatalogStore::in_memory().await.unwrap();
        let mut skill = sample("alice", "kube-helper", 10.0);
        store.upsert_skill(&skill).await.unwrap();
        skill.description = "Updated description".into();
        store.upsert_skill(&skill).await.unwrap();
        let fetched = store.get_skill(&skill.skill_id).await.unwrap().unwrap();
        assert_eq!(fetched.description, "Updated description");
        let history = store.version_history(&skill.skill_id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn delete_is_soft_and_excludes_from_browse() {
        let store = CatalogStore::in_memory().await.unwrap();
        let skill = sample("alice", "kube-helper", 10.0);
        store.upsert_skill(&skill).await.unwrap();
        store.delete_skill(&skill.skill_id).await.unwrap();
        assert!(store.get_skill(&skill.skill_id).await.unwrap().is_some());
        assert!(store.filter_browse(&Filters::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_browse_orders_by_composite_score_descending() {
        let store = CatalogStore::in_memory().await.unwrap();
        store.upsert_skill(&sample("alice", "low", 5.0)).await.unwrap();
        store.upsert_skill(&sample("bob", "high", 25.0)).await.unwrap();
        let results = store.filter_browse(&Filters::default()).await.unwrap();
        assert_eq!(results[0].name, "high");
    }

    #[tokio::test]
    async fn catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
        let skill_id = {
            let store = CatalogStore::open(&url).await.unwrap();
            let skill = sample("alice", "kube-helper", 10.0);
            store.upsert_skill(&skill).await.unwrap();
            skill.skill_id
        };
        let store = CatalogStore::open(&url).await.unwrap();
        assert!(store.get_skill(&skill_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn embedding_roundtrips_through_upsert_and_get() {
        let store = CatalogStore::in_memory().await.unwrap();
        let mut skill = sample("alice", "kube-helper", 10.0);
        skill.embedding = Some(vec![0.1, 0.2, 0.3]);
        store.upsert_skill(&skill).await.unwrap();
        let fetched = store.get_skill(&skill.skill_id).await.unwrap().unwrap();
        assert_eq!(fetched.embedding, Some(vec![0.1, 0.2, 0.3]));
    }

    #[tokio::test]
    async fn clearing_embedding_on_reupsert_removes_it() {
        let store = CatalogStore::in_memory().await.unwrap();
        let mut skill = sample("alice", "kube-helper", 10.0);
        skill.embedding = Some(vec![0.1, 0.2, 0.3]);
        store.upsert_skill(&skill).await.unwrap();
        skill.embedding = None;
        store.upsert_skill(&skill).await.unwrap();
        let fetched = store.get_skill(&skill.skill_id).await.unwrap().unwrap();
        assert_eq!(fetched.embedding, None);
    }

    #[tokio::test]
    async fn vector_search_ranks_nearest_neighbor_first() {
        let store = CatalogStore::in_memory().await.unwrap();
        let mut close = sample("alice", "close", 10.0);
        close.embedding = Some(vec![1.0, 0.0, 0.0]);
        let mut far = sample("bob", "far", 10.0);
        far.embedding = Some(vec![0.0, 1.0, 0.0]);
        store.upsert_skill(&close).await.unwrap();
        store.upsert_skill(&far).await.unwrap();

        let results = store.vector_search(&[1.0, 0.0, 0.0], &Filters::default(), 5).await.unwrap();
        assert_eq!(results[0].0.name, "close");
        assert!(results[0].1 > results[1].1);
    }

    #[tokio::test]
    async fn vector_search_skips_skills_without_an_embedding() {
        let store = CatalogStore::in_memory().await.unwrap();
        store.upsert_skill(&sample("alice", "no-vector", 10.0)).await.unwrap();
        let results = store.vector_search(&[1.0, 0.0, 0.0], &Filters::default(), 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn lexical_search_weights_name_over_description() {
        let store = CatalogStore::in_memory().await.unwrap();
        let mut name_match = sample("alice", "kube", 10.0);
        name_match.name = "kube".into();
        name_match.description = "does container things".into();
        let mut description_match = sample("bob", "helper", 10.0);
        description_match.name = "helper".into();
        description_match.description = "a kube automation assistant".into();
        store.upsert_skill(&name_match).await.unwrap();
        store.upsert_skill(&description_match).await.unwrap();

        let results = store.lexical_search("kube", &Filters::default(), 0, 20).await.unwrap();
        assert_eq!(results[0].0.name, "kube");
    }

    #[tokio::test]
    async fn lexical_search_matches_on_author() {
        let store = CatalogStore::in_memory().await.unwrap();
        let mut skill = sample("kubeexpert", "helper", 10.0);
        skill.author = "kubeexpert".into();
        skill.description = "a generic assistant".into();
        store.upsert_skill(&skill).await.unwrap();

        let results = store.lexical_search("kubeexpert", &Filters::default(), 0, 20).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn lexical_search_paginates_results() {
        let store = CatalogStore::in_memory().await.unwrap();
        for i in 0..5 {
            let mut skill = sample("alice", &format!("skill-{i}"), 10.0);
            skill.description = "automation helper".into();
            store.upsert_skill(&skill).await.unwrap();
        }
        let page = store.lexical_search("automation", &Filters::default(), 2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
    }
}
