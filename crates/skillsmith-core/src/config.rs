//! Process-wide configuration snapshot.
//!
//! Built once at startup from defaults, an optional TOML file, and
//! environment overrides; refreshed only by constructing a new snapshot,
//! never mutated in place (spec §5: "no globals other than a process-wide
//! configuration snapshot").

use crate::errors::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_catalog_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".skillsmith")
}

fn default_sync_frequency() -> SyncFrequency {
    SyncFrequency::Daily
}

fn default_poll_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncFrequency {
    Daily,
    Weekly,
}

/// Upstream auth credentials in priority order (installation-token exchange
/// > static token > unauthenticated), per spec §4.1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub app_id: Option<String>,
    pub app_installation_id: Option<String>,
    pub app_private_key: Option<String>,
    pub personal_access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub logarithmic_scoring: bool,
    #[serde(default)]
    pub strict_validation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self { logarithmic_scoring: true, strict_validation: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,
    #[serde(default)]
    pub background_sync: bool,
    #[serde(default = "default_sync_frequency")]
    pub sync_frequency: SyncFrequency,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub telemetry: bool,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            catalog_dir: default_catalog_dir(),
            background_sync: false,
            sync_frequency: default_sync_frequency(),
            poll_interval_secs: default_poll_interval_secs(),
            log_level: None,
            telemetry: false,
            auth: AuthConfig::default(),
            features: FeatureFlags::default(),
        }
    }
}

impl CoreConfig {
    /// Load defaults, overlay a TOML file if present, then overlay
    /// environment variables (spec §6.5).
    pub fn load(toml_path: Option<&std::path::Path>) -> Result<Self> {
        let mut cfg = if let Some(path) = toml_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            } else {
                Self::default()
            }
        } else {
            Self::default()
        };

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CATALOG_DIR") {
            self.catalog_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BACKGROUND_SYNC") {
            self.background_sync = v.eq_ignore_ascii_case("on");
        }
        if let Ok(v) = std::env::var("SYNC_FREQUENCY") {
            self.sync_frequency = match v.to_lowercase().as_str() {
                "weekly" => SyncFrequency::Weekly,
                _ => SyncFrequency::Daily,
            };
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            self.log_level = Some(v);
        }
        if let Ok(v) = std::env::var("TELEMETRY") {
            self.telemetry = v.eq_ignore_ascii_case("on");
        }
        if let Ok(v) = std::env::var("APP_ID") {
            self.auth.app_id = Some(v);
        }
        if let Ok(v) = std::env::var("APP_INSTALLATION_ID") {
            self.auth.app_installation_id = Some(v);
        }
        if let Ok(v) = std::env::var("APP_PRIVATE_KEY") {
            self.auth.app_private_key = Some(v);
        }
        if let Ok(v) = std::env::var("GITHUB_TOKEN").or_else(|_| std::env::var("SKILLSMITH_TOKEN")) {
            self.auth.personal_access_token = Some(v);
        }
    }

    pub fn audit_path(&self) -> PathBuf {
        self.catalog_dir.join("audit").join("chain.log")
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.catalog_dir.join("catalog").join("v1.db")
    }

    pub fn quarantine_db_path(&self) -> PathBuf {
        self.catalog_dir.join("quarantine").join("state.db")
    }

    pub fn sync_state_path(&self) -> PathBuf {
        self.catalog_dir.join("sync").join("state.json")
    }
}

/// Expand `${VAR}` / `${VAR:-default}` / `${VAR:?error}` references in a
/// string against the process environment.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            let mut depth = 1;
            for c in chars.by_ref() {
                if c == '{' {
                    depth += 1;
                    var_expr.push(c);
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    var_expr.push(c);
                } else {
                    var_expr.push(c);
                }
            }

            let value = if let Some(pos) = var_expr.find(":-") {
                let var_name = &var_expr[..pos];
                let default_value = &var_expr[pos + 2..];
                std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
            } else if let Some(pos) = var_expr.find(":?") {
                let var_name = &var_expr[..pos];
                let error_msg = &var_expr[pos + 2..];
                std::env::var(var_name)
                    .map_err(|_| CoreError::Config(format!("{var_name} not set: {error_msg}")))?
            } else {
                std::env::var(&var_expr)
                    .map_err(|_| CoreError::Config(format!("{var_expr} not set")))?
            };

            result.push_str(&value);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

/// Heuristic used by the config loader and the audit log to avoid ever
/// writing a likely-secret value verbatim.
pub fn is_likely_secret(key: &str) -> bool {
    let key = key.to_lowercase();
    ["secret", "password", "token", "private_key", "credential", "auth"]
        .iter()
        .any(|needle| key.contains(needle))
}
