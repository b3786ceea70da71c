//! Core domain entities: Skill, Trust Tier, Scan Finding/Result, Quarantine
//! Entry, Audit Entry, Query, Search Result, and Recommendation Context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Log level for host logging, honoring the `LOG_LEVEL` environment
/// variable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Ordered trust classification. Order matters: it is used both for
/// comparisons ("at least Community") and for the auto-downgrade rule in
/// the Scoring Engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    Local,
    Unknown,
    Experimental,
    Community,
    Curated,
    Verified,
}

/// Per-tier scanner configuration: the risk threshold above which a scan
/// recommends quarantine, and the maximum content size accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierConfig {
    pub risk_threshold: f64,
    pub max_content_bytes: u64,
}

impl std::str::FromStr for TrustTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(TrustTier::Local),
            "unknown" => Ok(TrustTier::Unknown),
            "experimental" => Ok(TrustTier::Experimental),
            "community" => Ok(TrustTier::Community),
            "curated" => Ok(TrustTier::Curated),
            "verified" => Ok(TrustTier::Verified),
            other => Err(format!("unknown trust tier: {other}")),
        }
    }
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrustTier::Local => "local",
            TrustTier::Unknown => "unknown",
            TrustTier::Experimental => "experimental",
            TrustTier::Community => "community",
            TrustTier::Curated => "curated",
            TrustTier::Verified => "verified",
        };
        write!(f, "{s}")
    }
}

impl TrustTier {
    /// Default scanner configuration for this tier, per spec §3.
    pub fn default_config(self) -> TierConfig {
        match self {
            TrustTier::Verified => TierConfig { risk_threshold: 70.0, max_content_bytes: 2 * 1024 * 1024 },
            TrustTier::Curated => TierConfig { risk_threshold: 60.0, max_content_bytes: 2 * 1024 * 1024 },
            TrustTier::Community => TierConfig { risk_threshold: 40.0, max_content_bytes: 1024 * 1024 },
            TrustTier::Experimental => TierConfig { risk_threshold: 25.0, max_content_bytes: 500 * 1024 },
            TrustTier::Unknown => TierConfig { risk_threshold: 20.0, max_content_bytes: 250 * 1024 },
            TrustTier::Local => TierConfig { risk_threshold: f64::INFINITY, max_content_bytes: 10 * 1024 * 1024 },
        }
    }
}

/// Declared host/model compatibility for a skill.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Compatibility {
    #[serde(default)]
    pub ides: Vec<String>,
    #[serde(default)]
    pub llms: Vec<String>,
}

impl Compatibility {
    pub fn is_empty(&self) -> bool {
        self.ides.is_empty() && self.llms.is_empty()
    }

    /// Permissive intersection per §4.7 `compatibility` filter semantics:
    /// an empty declared set passes any request.
    pub fn intersects(&self, requested: &Compatibility) -> bool {
        if self.is_empty() {
            return true;
        }
        requested.ides.iter().any(|i| self.ides.contains(i))
            || requested.llms.iter().any(|m| self.llms.contains(m))
    }
}

/// Security scan status tracked on a Skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Safe,
    Review,
    Quarantined,
}

/// Composite sub-scores on their local scales.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SubScores {
    pub popularity: f64,
    pub activity: f64,
    pub documentation: f64,
    pub trust: f64,
}

impl SubScores {
    pub fn composite(&self) -> u32 {
        let sum = self.popularity + self.activity + self.documentation + self.trust;
        sum.round().clamp(0.0, 100.0) as u32
    }
}

/// Upstream popularity/activity signals for a Skill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamSignals {
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub last_updated: Option<DateTime<Utc>>,
    pub contributors: u64,
    pub license: Option<String>,
}

/// The indexed representation of a single discovered skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub skill_id: String,
    pub author: String,
    pub name: String,
    pub content_hash: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    /// Trigger phrases used for recommendation overlap filtering (spec §4.8).
    pub triggers: Vec<String>,
    /// Declared roles this skill targets, for the recommender's role bonus.
    pub roles: Vec<String>,
    pub upstream_source_id: String,
    pub upstream_revision: String,
    pub size_bytes: u64,
    pub language: Option<String>,
    pub version: Option<String>,
    pub compatibility: Option<Compatibility>,
    pub repository_url: Option<String>,
    pub signals: UpstreamSignals,
    pub sub_scores: SubScores,
    pub trust_tier: TrustTier,
    pub scan_status: ScanStatus,
    pub risk_score: f64,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vec<f32>>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Skill {
    pub fn id_of(author: &str, name: &str) -> String {
        format!("{author}/{name}")
    }

    pub fn composite_score(&self) -> u32 {
        self.sub_scores.composite()
    }
}

/// Severity of a scan finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn base_points(self) -> f64 {
        match self {
            Severity::Low => 5.0,
            Severity::Medium => 15.0,
            Severity::High => 30.0,
            Severity::Critical => 50.0,
        }
    }
}

/// Confidence of a scan finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn multiplier(self) -> f64 {
        match self {
            Confidence::High => 1.0,
            Confidence::Medium => 0.7,
            Confidence::Low => 0.3,
        }
    }

    /// Reduce confidence by one step, used when a finding sits inside a
    /// fenced code block or table.
    pub fn reduce(self) -> Self {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium => Confidence::Low,
            Confidence::Low => Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFinding {
    pub category: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub matched_offset: usize,
    pub matched_length: usize,
    pub excerpt: String,
}

impl ScanFinding {
    pub fn weighted_points(&self, category_weight: f64) -> f64 {
        self.severity.base_points() * category_weight * self.confidence.multiplier()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanRecommendation {
    Safe,
    Review,
    Quarantine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub skill_content_hash: String,
    pub risk_score: f64,
    pub findings: Vec<ScanFinding>,
    pub recommendation: ScanRecommendation,
    pub scanner_version: String,
    pub timestamp: DateTime<Utc>,
}

/// Quarantine workflow state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineStatus {
    Pending,
    Approved,
    Rejected,
    Canceled,
}

impl QuarantineStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, QuarantineStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub reviewer_id: String,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub id: String,
    pub skill_id: String,
    pub reason: String,
    pub severity: Severity,
    pub status: QuarantineStatus,
    pub created_at: DateTime<Utc>,
    pub required_approvals: u32,
    pub approvals: Vec<Approval>,
}

impl QuarantineEntry {
    /// `required_approvals` per spec §3: default 1, 2 for severity = critical
    /// ("malicious").
    pub fn required_approvals_for(severity: Severity) -> u32 {
        if severity == Severity::Critical {
            2
        } else {
            1
        }
    }
}

/// Hash-chained append-only event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub data: serde_json::Value,
    pub previous_hash: String,
    pub hash: String,
}

/// Incoming filter set for a search query, per spec §3/§4.7.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filters {
    pub category: Option<String>,
    pub trust_tier: Option<TrustTier>,
    pub min_score: Option<u32>,
    pub max_risk: Option<f64>,
    pub safe_only: Option<bool>,
    pub compatibility: Option<Compatibility>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.trust_tier.is_none()
            && self.min_score.is_none()
            && self.max_risk.is_none()
            && self.safe_only.is_none()
            && self.compatibility.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: Option<String>,
    pub filters: Filters,
    pub limit: usize,
    pub offset: usize,
}

impl Query {
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Registry,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub skill_id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub trust_tier: TrustTier,
    pub score: f64,
    pub source: ResultSource,
    pub install_hint: Option<String>,
    pub compatibility: Option<Compatibility>,
    pub repository: Option<String>,
    pub highlights: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub timing_ms: u64,
    pub degraded: bool,
}

/// Caller-supplied context for recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub project_description: Option<String>,
    pub installed_skills: std::collections::HashSet<String>,
    pub role: Option<String>,
    pub stack: Option<Stack>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stack {
    pub frameworks: Vec<String>,
    pub languages: Vec<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub skill_id: String,
    pub reason: String,
    pub quality_score: u32,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
    pub candidates_considered: usize,
    pub overlap_filtered: usize,
    pub role_filtered: usize,
    pub degraded: bool,
}

pub type Metadata = HashMap<String, String>;

/// Which side a head-to-head comparison favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareWinner {
    A,
    B,
    Tie,
}

/// A single dimension where two compared skills diverge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareDifference {
    pub dimension: String,
    pub a: String,
    pub b: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    pub a: Skill,
    pub b: Skill,
    pub differences: Vec<CompareDifference>,
    pub winner: CompareWinner,
    pub recommendation: String,
    pub timing_ms: u64,
}

/// A short summary of a skill's most recent scan, returned alongside a
/// `suggest-install` decision so a caller can see why without a second
/// `get_skill` round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scan_status: ScanStatus,
    pub risk_score: f64,
    pub last_scan_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestInstallResponse {
    pub allowed: bool,
    pub reason: String,
    pub tier: TrustTier,
    pub scan_summary: ScanSummary,
}
