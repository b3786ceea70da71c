//! Turns raw skill document bytes into a structured candidate, rejecting
//! documents that cannot be safely indexed (C2).
//!
//! Frontmatter extraction is grounded on `skill_md.rs`'s `---`-fence
//! splitting; this module adds the full field set from spec §6.2 and the
//! ordered rule list from spec §4.2 in front of it.

use crate::errors::{CoreError, Result};
use crate::types::Compatibility;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Recognized frontmatter keys for a skill document (spec §6.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillFrontmatter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub compatibility: Option<Compatibility>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

/// Options controlling which rules in §4.2's ordered list are enforced.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub min_content_length: usize,
    pub strict: bool,
    /// Upstream repository owner, used for the rule-5 author fallback.
    pub upstream_owner: Option<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self { min_content_length: 100, strict: false, upstream_owner: None }
    }
}

/// The structured result of a successful validation.
#[derive(Debug, Clone)]
pub struct ValidatedSkill {
    pub name: String,
    pub description: String,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub version: Option<String>,
    pub triggers: Vec<String>,
    pub examples: Vec<String>,
    pub compatibility: Option<Compatibility>,
    /// The canonical body the scanner and hasher see: frontmatter stripped,
    /// trimmed.
    pub body: String,
    pub has_frontmatter: bool,
}

fn heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^# ").unwrap())
}

/// Validate raw document bytes per spec §4.2's ordered rule list. The first
/// required-rule failure aborts with a `CoreError::Validation`.
pub fn validate(bytes: &[u8], options: &ValidationOptions) -> Result<ValidatedSkill> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| CoreError::Validation(format!("not valid UTF-8: {e}")))?;
    let trimmed = content.trim();

    // Rule 1: non-empty after trimming.
    if trimmed.is_empty() {
        return Err(CoreError::Validation("document is empty".into()));
    }

    // Rule 2: minimum length.
    if trimmed.len() < options.min_content_length {
        return Err(CoreError::Validation(format!(
            "document is {} chars, below minimum of {}",
            trimmed.len(),
            options.min_content_length
        )));
    }

    let (frontmatter, body, has_frontmatter) = split_frontmatter(trimmed, options.strict)?;

    // Rule 3: at least one top-level heading. Checked against the body so a
    // frontmatter-only document still fails it.
    if !heading_pattern().is_match(&body) {
        return Err(CoreError::Validation("missing a top-level `# ` heading".into()));
    }

    // Rule 4 (+ rule 6 in strict mode): name required, description length
    // floor, both enforced above when frontmatter is present or required.
    let mut name = frontmatter.name.clone();
    let mut description = frontmatter.description.clone();
    let mut author = frontmatter.author.clone();

    if options.strict {
        if !has_frontmatter {
            return Err(CoreError::Validation("strict mode requires frontmatter".into()));
        }
        if name.as_deref().unwrap_or("").is_empty() {
            return Err(CoreError::Validation("strict mode requires a `name` field".into()));
        }
        let desc = description.as_deref().unwrap_or("");
        if desc.len() < 20 {
            return Err(CoreError::Validation(format!(
                "strict mode requires `description` of at least 20 chars, got {}",
                desc.len()
            )));
        }
    } else {
        if has_frontmatter {
            if name.as_deref().unwrap_or("").is_empty() {
                return Err(CoreError::Validation("frontmatter is present but missing `name`".into()));
            }
            if let Some(desc) = &description {
                if desc.len() < 20 {
                    return Err(CoreError::Validation(format!(
                        "`description` must be at least 20 chars, got {}",
                        desc.len()
                    )));
                }
            }
        }

        // Rule 5: auto-repair fallbacks.
        if author.is_none() {
            author = options.upstream_owner.clone();
        }
        if description.is_none() {
            description = name.clone();
        }
        if name.is_none() {
            name = derive_name_from_heading(&body);
        }
    }

    let name = name.ok_or_else(|| CoreError::Validation("could not determine a skill name".into()))?;
    let description = description.unwrap_or_else(|| name.clone());

    Ok(ValidatedSkill {
        name,
        description,
        author,
        tags: frontmatter.tags,
        category: frontmatter.category,
        version: frontmatter.version,
        triggers: frontmatter.triggers,
        examples: frontmatter.examples,
        compatibility: frontmatter.compatibility,
        body,
        has_frontmatter,
    })
}

fn derive_name_from_heading(body: &str) -> Option<String> {
    body.lines()
        .find(|l| l.starts_with("# "))
        .map(|l| l.trim_start_matches("# ").trim().to_string())
}

fn split_frontmatter(content: &str, strict: bool) -> Result<(SkillFrontmatter, String, bool)> {
    if !content.starts_with("---") {
        if strict {
            return Err(CoreError::Validation("strict mode requires frontmatter".into()));
        }
        return Ok((SkillFrontmatter::default(), content.to_string(), false));
    }

    let after_first = &content[3..];
    let end_pos = after_first
        .find("\n---")
        .ok_or_else(|| CoreError::Validation("opening `---` has no closing `---`".into()))?;

    let yaml = after_first[..end_pos].trim();
    let body_start = 3 + end_pos + 4;
    let body = if body_start < content.len() { content[body_start..].trim().to_string() } else { String::new() };

    let frontmatter: SkillFrontmatter =
        serde_yaml::from_str(yaml).map_err(|e| CoreError::Validation(format!("invalid frontmatter: {e}")))?;

    Ok((frontmatter, body, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(body: &str) -> String {
        format!("{body}\n{}", "padding text to clear the minimum length threshold for tests.\n".repeat(2))
    }

    #[test]
    fn rejects_empty_content() {
        let err = validate(b"   \n\t  ", &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn rejects_below_minimum_length() {
        let err = validate(b"# Hi\nshort", &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn rejects_missing_heading() {
        let content = padded("Just prose, no heading here.");
        let err = validate(content.as_bytes(), &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn accepts_plain_document_without_frontmatter() {
        let content = padded("# My Skill\nDoes a thing.");
        let result = validate(content.as_bytes(), &ValidationOptions::default()).unwrap();
        assert_eq!(result.name, "My Skill");
        assert!(!result.has_frontmatter);
    }

    #[test]
    fn parses_full_frontmatter() {
        let content = format!(
            "---\nname: kube-helper\ndescription: Manages Kubernetes clusters via kubectl commands\ntags: [k8s, ops]\ncategory: infra\nversion: \"1.2.0\"\n---\n\n{}",
            padded("# Kube Helper")
        );
        let result = validate(content.as_bytes(), &ValidationOptions::default()).unwrap();
        assert_eq!(result.name, "kube-helper");
        assert_eq!(result.tags, vec!["k8s", "ops"]);
        assert_eq!(result.category.as_deref(), Some("infra"));
        assert!(result.has_frontmatter);
    }

    #[test]
    fn rejects_frontmatter_missing_name() {
        let content = format!("---\ndescription: Manages Kubernetes clusters via kubectl commands\n---\n\n{}", padded("# Kube Helper"));
        let err = validate(content.as_bytes(), &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn rejects_short_description_when_present() {
        let content = format!("---\nname: kube-helper\ndescription: too short\n---\n\n{}", padded("# Kube Helper"));
        let err = validate(content.as_bytes(), &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn auto_repairs_missing_author_and_description() {
        let content = format!("---\nname: kube-helper\n---\n\n{}", padded("# Kube Helper"));
        let options = ValidationOptions { upstream_owner: Some("anthropics".into()), ..Default::default() };
        let result = validate(content.as_bytes(), &options).unwrap();
        assert_eq!(result.author.as_deref(), Some("anthropics"));
        assert_eq!(result.description, "kube-helper");
    }

    #[test]
    fn strict_mode_requires_frontmatter() {
        let content = padded("# My Skill\nDoes a thing.");
        let options = ValidationOptions { strict: true, ..Default::default() };
        let err = validate(content.as_bytes(), &options).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn strict_mode_rejects_short_description_even_if_present_rule_would_allow_missing() {
        let content = format!("---\nname: kube-helper\ndescription: short\n---\n\n{}", padded("# Kube Helper"));
        let options = ValidationOptions { strict: true, ..Default::default() };
        let err = validate(content.as_bytes(), &options).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn preserves_unknown_frontmatter_fields_verbatim() {
        let content = format!(
            "---\nname: kube-helper\ndescription: Manages Kubernetes clusters via kubectl commands\ncustom_field: surprise\n---\n\n{}",
            padded("# Kube Helper")
        );
        let (frontmatter, _, _) = split_frontmatter(content.trim(), false).unwrap();
        assert!(frontmatter.extra.contains_key("custom_field"));
    }
}
