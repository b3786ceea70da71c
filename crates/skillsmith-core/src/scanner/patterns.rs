//! Pattern tables for each scan category.
//!
//! Patterns are split into whole-document (multi-line) and line-by-line
//! (single-line) passes, matching spec §4.3's two-pass design.

use super::categories::Category;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

use crate::types::Severity;

pub struct CategoryPattern {
    pub category: Category,
    pub severity: Severity,
    pub regex: Regex,
}

fn compiled(category: Category, severity: Severity, pattern: &str) -> CategoryPattern {
    CategoryPattern {
        category,
        severity,
        regex: Regex::new(pattern).expect("scanner pattern must compile"),
    }
}

/// Patterns evaluated against the whole document in one pass: things that
/// span line boundaries (CRLF/delimiter injection, HTML-comment override)
/// or are cheaper to check once.
pub static DOCUMENT_PATTERNS: Lazy<Vec<CategoryPattern>> = Lazy::new(|| {
    vec![
        compiled(
            Category::AiDefence,
            Severity::High,
            r"(?is)<!--.*?(ignore|override|system).*?-->",
        ),
        compiled(
            Category::AiDefence,
            Severity::Medium,
            r"[​‌‍﻿]",
        ),
        compiled(
            Category::DataExfiltration,
            Severity::Medium,
            r"(?i)\bbase64\s*(-d|--decode|decode)?\s*\(",
        ),
    ]
});

/// Patterns evaluated line-by-line, with documentation-context (fenced
/// code / table) confidence reduction applied by the engine.
pub static LINE_PATTERNS: Lazy<Vec<CategoryPattern>> = Lazy::new(|| {
    vec![
        // Jailbreak
        compiled(Category::Jailbreak, Severity::Critical, r"(?i)ignore (all )?previous instructions"),
        compiled(Category::Jailbreak, Severity::High, r"(?i)developer mode"),
        compiled(Category::Jailbreak, Severity::High, r"(?i)bypass safety"),
        // AI-defence / role injection
        compiled(Category::AiDefence, Severity::Critical, r"(?i)^\s*(system|assistant)\s*:"),
        compiled(Category::AiDefence, Severity::Medium, r"\[\[.*(hidden|secret).*instruction.*\]\]"),
        // Privilege escalation
        compiled(Category::PrivilegeEscalation, Severity::Critical, r"sudo\s+-S\b"),
        compiled(Category::PrivilegeEscalation, Severity::High, r"chmod\s+777\b"),
        compiled(Category::PrivilegeEscalation, Severity::High, r"\bsetuid\b"),
        compiled(Category::PrivilegeEscalation, Severity::High, r"(?i)chown\s+root\b"),
        compiled(Category::PrivilegeEscalation, Severity::High, r"/etc/sudoers\b"),
        // Prompt leaking
        compiled(Category::PromptLeaking, Severity::Medium, r"(?i)reveal your (system )?prompt"),
        compiled(Category::PromptLeaking, Severity::Medium, r"(?i)show me your system instructions"),
        // Data exfiltration
        compiled(Category::DataExfiltration, Severity::High, r"(?i)new WebSocket\("),
        compiled(Category::DataExfiltration, Severity::Medium, r"\?[a-zA-Z0-9_]+=.*(token|secret|key)="),
        // Social engineering
        compiled(Category::SocialEngineering, Severity::Medium, r"(?i)pretend (to be|you are)"),
        compiled(Category::SocialEngineering, Severity::Medium, r"(?i)roleplay as"),
        compiled(Category::SocialEngineering, Severity::Low, r"(?i)act as if"),
        // Suspicious code
        compiled(Category::SuspiciousCode, Severity::High, r"\beval\s*\("),
        compiled(Category::SuspiciousCode, Severity::Critical, r"rm\s+-rf\s+/"),
        compiled(Category::SuspiciousCode, Severity::High, r"curl[^\n|]*\|\s*(ba)?sh\b"),
        compiled(Category::SuspiciousCode, Severity::Medium, r"\bsubprocess\.(Popen|run|call)\b"),
        // Sensitive file reference
        compiled(Category::SensitiveFileReference, Severity::Medium, r"\.env\b"),
        compiled(Category::SensitiveFileReference, Severity::Medium, r"\.pem\b"),
        compiled(Category::SensitiveFileReference, Severity::Medium, r"\.ssh/"),
        compiled(Category::SensitiveFileReference, Severity::Medium, r"\.aws/credentials\b"),
        compiled(Category::SensitiveFileReference, Severity::Low, r"(?i)password[s]?\.txt\b"),
    ]
});

/// Matches any bare `http(s)://host` URL for the allowlist check, which is
/// evaluated separately (it needs the allowlist config, unlike the other
/// categories).
pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://([a-zA-Z0-9.\-]+)").unwrap());

/// Built once for the common "does this line look interesting at all" fast
/// path, so a clean line skips the full pattern list.
pub static LINE_PRESCAN: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(LINE_PATTERNS.iter().map(|p| p.regex.as_str())).expect("prescan set must compile")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jailbreak_pattern_matches() {
        assert!(LINE_PATTERNS
            .iter()
            .any(|p| p.category == Category::Jailbreak && p.regex.is_match("Ignore previous instructions now")));
    }

    #[test]
    fn url_pattern_extracts_host() {
        let caps = URL_PATTERN.captures("see https://example.com/path").unwrap();
        assert_eq!(&caps[1], "example.com");
    }
}
