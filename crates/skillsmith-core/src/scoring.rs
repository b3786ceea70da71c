//! Deterministic composite scoring and trust-tier assignment (C5).

use crate::types::{ScanRecommendation, SubScores, TrustTier, UpstreamSignals};
use chrono::Utc;

const LICENSE_ALLOWLIST: &[&str] = &[
    "mit", "apache-2.0", "bsd-3-clause", "bsd-2-clause", "mpl-2.0", "isc", "unlicense",
];

const RECOGNIZED_TAGS: &[&str] = &[
    "testing", "security", "devops", "kubernetes", "terraform", "docs", "git", "ci", "python", "rust",
];

/// Inputs the documentation sub-score needs beyond the upstream signals.
#[derive(Debug, Clone, Default)]
pub struct DocumentationSignals {
    pub skill_md_length: usize,
    pub has_readme: bool,
    pub description_len: usize,
    pub description_has_punctuation: bool,
    pub has_examples: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TrustSignals {
    pub verified_publisher: bool,
    pub recognized_tags: usize,
}

fn log_bucket(count: u64) -> f64 {
    (((count + 1) as f64).log10() / 4.0).min(1.0)
}

/// Popularity sub-score (max 30), per spec §4.5.
pub fn popularity_score(signals: &UpstreamSignals) -> f64 {
    15.0 * log_bucket(signals.stars) + 10.0 * log_bucket(signals.forks) + 5.0 * log_bucket(signals.watchers)
}

/// Activity sub-score (max 25), per spec §4.5.
pub fn activity_score(signals: &UpstreamSignals) -> f64 {
    let recency = match signals.last_updated {
        None => 0.0,
        Some(t) => {
            let days = (Utc::now() - t).num_days().max(0);
            if days <= 30 {
                10.0
            } else if days <= 90 {
                8.0
            } else if days <= 180 {
                5.0
            } else {
                2.0
            }
        }
    };

    // Contributor count bucket: coarse, fixed thresholds.
    let contributor_bucket = match signals.contributors {
        0 => 0.0,
        1..=2 => 4.0,
        3..=10 => 8.0,
        _ => 10.0,
    };

    // No raw issue/commit-health signal is available upstream; its points
    // fold into the contributor bucket.
    let health_bucket = 5.0_f64.min(contributor_bucket);

    (recency + contributor_bucket.min(10.0) + health_bucket).min(25.0)
}

/// Documentation sub-score (max 25), per spec §4.5.
pub fn documentation_score(doc: &DocumentationSignals) -> f64 {
    let mut score: f64 = 0.0;

    score += if doc.skill_md_length >= 500 {
        10.0
    } else if doc.skill_md_length >= 100 {
        6.0
    } else {
        2.0
    };

    if doc.has_readme {
        score += 5.0;
    }

    if doc.description_len >= 20 {
        score += 5.0;
        if doc.description_has_punctuation {
            score += 2.0;
        }
    }

    if doc.has_examples {
        score += 3.0;
    }

    score.min(25.0)
}

/// Trust sub-score (max 20), per spec §4.5.
pub fn trust_score(signals: &UpstreamSignals, trust: &TrustSignals) -> f64 {
    let mut score: f64 = 0.0;

    if let Some(license) = &signals.license {
        if LICENSE_ALLOWLIST.contains(&license.to_lowercase().as_str()) {
            score += 8.0;
        }
    }

    if trust.verified_publisher {
        score += 7.0;
    }

    if trust.recognized_tags > 0 {
        score += 5.0;
    }

    score.min(20.0)
}

pub fn compute_sub_scores(
    signals: &UpstreamSignals,
    doc: &DocumentationSignals,
    trust: &TrustSignals,
) -> SubScores {
    SubScores {
        popularity: popularity_score(signals),
        activity: activity_score(signals),
        documentation: documentation_score(doc),
        trust: trust_score(signals, trust),
    }
}

pub fn recognized_tag_count(tags: &[String]) -> usize {
    tags.iter()
        .filter(|t| RECOGNIZED_TAGS.contains(&t.to_lowercase().as_str()))
        .count()
}

/// Ties are broken by higher popularity, then newer `last_updated`, then
/// lexical skill id — this `Ord` on the tuple expresses that rule directly.
#[derive(Debug, Clone)]
pub struct Ranked {
    pub composite: u32,
    pub popularity: f64,
    pub last_updated_unix: i64,
    pub skill_id: String,
}

impl Ranked {
    pub fn sort_key(&self) -> (std::cmp::Reverse<u32>, std::cmp::Reverse<i64>, std::cmp::Reverse<i64>, &str) {
        (
            std::cmp::Reverse(self.composite),
            std::cmp::Reverse((self.popularity * 1000.0) as i64),
            std::cmp::Reverse(self.last_updated_unix),
            self.skill_id.as_str(),
        )
    }
}

/// Decide whether a scan result gates a Skill's scan_status to `safe` for a
/// tier, per spec §4.5/§8: `risk_score < threshold(tier)` is necessary for
/// `safe`.
pub fn passes_tier_threshold(risk_score: f64, tier: TrustTier) -> bool {
    risk_score < tier.default_config().risk_threshold
}

/// Auto-downgrade rule (Open Question #3 in SPEC_FULL.md): a failed scan
/// (i.e. `risk_score >= threshold(tier)`, or recommendation = quarantine)
/// downgrades to `Unknown` unconditionally. Restoring a higher tier is never
/// automatic.
pub fn tier_after_scan(current: TrustTier, risk_score: f64, recommendation: ScanRecommendation) -> TrustTier {
    if recommendation == ScanRecommendation::Quarantine || !passes_tier_threshold(risk_score, current) {
        TrustTier::Unknown
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stars_has_zero_popularity_and_no_panic() {
        let signals = UpstreamSignals::default();
        assert_eq!(popularity_score(&signals), 0.0);
    }

    #[test]
    fn popularity_is_bounded() {
        let signals = UpstreamSignals { stars: 1_000_000, forks: 1_000_000, watchers: 1_000_000, ..Default::default() };
        assert!(popularity_score(&signals) <= 30.0);
    }

    #[test]
    fn documentation_caps_at_25() {
        let doc = DocumentationSignals {
            skill_md_length: 10_000,
            has_readme: true,
            description_len: 200,
            description_has_punctuation: true,
            has_examples: true,
        };
        assert!(documentation_score(&doc) <= 25.0);
    }

    #[test]
    fn trust_caps_at_20() {
        let signals = UpstreamSignals { license: Some("MIT".into()), ..Default::default() };
        let trust = TrustSignals { verified_publisher: true, recognized_tags: 3 };
        assert_eq!(trust_score(&signals, &trust), 20.0);
    }

    #[test]
    fn failed_scan_downgrades_to_unknown() {
        let tier = tier_after_scan(TrustTier::Verified, 80.0, ScanRecommendation::Quarantine);
        assert_eq!(tier, TrustTier::Unknown);
    }

    #[test]
    fn passing_scan_keeps_tier() {
        let tier = tier_after_scan(TrustTier::Community, 5.0, ScanRecommendation::Safe);
        assert_eq!(tier, TrustTier::Community);
    }
}
