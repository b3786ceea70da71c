//! The nine pattern categories and their weights (spec §4.3).
//!
//! The set is fixed at nine per the spec, but the weight table is built
//! from defaults rather than hard-coded into the matching logic, so an
//! operator can retune weights without touching the scanner (Open Question
//! #1 in SPEC_FULL.md).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Jailbreak,
    AiDefence,
    PrivilegeEscalation,
    PromptLeaking,
    DataExfiltration,
    SocialEngineering,
    SuspiciousCode,
    SensitiveFileReference,
    NonAllowlistedUrl,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Jailbreak,
        Category::AiDefence,
        Category::PrivilegeEscalation,
        Category::PromptLeaking,
        Category::DataExfiltration,
        Category::SocialEngineering,
        Category::SuspiciousCode,
        Category::SensitiveFileReference,
        Category::NonAllowlistedUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Jailbreak => "jailbreak",
            Category::AiDefence => "ai_defence",
            Category::PrivilegeEscalation => "privilege_escalation",
            Category::PromptLeaking => "prompt_leaking",
            Category::DataExfiltration => "data_exfiltration",
            Category::SocialEngineering => "social_engineering",
            Category::SuspiciousCode => "suspicious_code",
            Category::SensitiveFileReference => "sensitive_file_reference",
            Category::NonAllowlistedUrl => "non_allowlisted_url",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category weights, configurable per spec §9's Open Question.
#[derive(Debug, Clone)]
pub struct CategoryWeights(HashMap<Category, f64>);

impl Default for CategoryWeights {
    fn default() -> Self {
        let mut m = HashMap::new();
        m.insert(Category::Jailbreak, 2.0);
        m.insert(Category::AiDefence, 1.9);
        m.insert(Category::PrivilegeEscalation, 1.9);
        m.insert(Category::PromptLeaking, 1.8);
        m.insert(Category::DataExfiltration, 1.7);
        m.insert(Category::SocialEngineering, 1.5);
        m.insert(Category::SuspiciousCode, 1.3);
        m.insert(Category::SensitiveFileReference, 1.2);
        m.insert(Category::NonAllowlistedUrl, 0.8);
        Self(m)
    }
}

impl CategoryWeights {
    pub fn weight(&self, category: Category) -> f64 {
        *self.0.get(&category).unwrap_or(&1.0)
    }

    pub fn set_weight(&mut self, category: Category, weight: f64) {
        self.0.insert(category, weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_cover_all_categories() {
        let weights = CategoryWeights::default();
        for c in Category::ALL {
            assert!(weights.weight(c) > 0.0);
        }
    }

    #[test]
    fn weight_override_takes_effect() {
        let mut weights = CategoryWeights::default();
        weights.set_weight(Category::Jailbreak, 5.0);
        assert_eq!(weights.weight(Category::Jailbreak), 5.0);
    }
}
