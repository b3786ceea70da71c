use thiserror::Error;

/// Core error type shared by every Skillsmith subsystem.
///
/// Variants map onto the error taxonomy kinds (input, upstream transient,
/// upstream permanent, policy, quarantine, storage, concurrency) rather than
/// onto individual call sites, so transports can render a remediation hint
/// from the kind alone.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("empty query: provide text or at least one filter")]
    EmptyQuery,

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid skill id: {0}")]
    InvalidSkillId(String),

    #[error("compare requires two distinct skill ids")]
    IdenticalIds,

    #[error("request blocked: host resolves to a private or link-local address")]
    BlockedHost,

    #[error("rate limited, retry after {reset_at}")]
    RateLimited { reset_at: chrono::DateTime<chrono::Utc> },

    #[error("upstream resource not found")]
    NotFound,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("skill is quarantined (entry {entry_id})")]
    Quarantined { entry_id: String },

    #[error("insufficient trust tier for this operation")]
    InsufficientTrust,

    #[error("quarantine entry is in a terminal state")]
    TerminalState,

    #[error("reviewer already approved this entry")]
    AlreadyApproved,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("audit chain broken at entry {0}")]
    ChainBroken(u64),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serde(e.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

/// Machine-readable error kind, independent of message text, for transports
/// that need to branch on the taxonomy (CLI exit codes, tool-surface error
/// kinds) without matching on `CoreError` variants directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    UpstreamTransient,
    UpstreamPermanent,
    Policy,
    Quarantine,
    Storage,
    Concurrency,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        use CoreError::*;
        match self {
            EmptyQuery | InvalidFilter(_) | InvalidSkillId(_) | IdenticalIds | Validation(_) => {
                ErrorKind::Input
            }
            RateLimited { .. } | UpstreamUnavailable(_) => ErrorKind::UpstreamTransient,
            NotFound => ErrorKind::UpstreamPermanent,
            BlockedHost => ErrorKind::Policy,
            Quarantined { .. } | InsufficientTrust => ErrorKind::Quarantine,
            Storage(_) | ChainBroken(_) | Io(_) | Serde(_) | Config(_) => ErrorKind::Storage,
            TerminalState | AlreadyApproved => ErrorKind::Concurrency,
        }
    }

    /// A short remediation hint, when one is known, per the §7
    /// "user-visible behavior" contract.
    pub fn remediation_hint(&self) -> Option<&'static str> {
        match self {
            CoreError::RateLimited { .. } => {
                Some("set authentication to raise rate limit")
            }
            CoreError::BlockedHost => Some("the request target is not a routable public host"),
            CoreError::EmptyQuery => Some("pass --text or at least one filter flag"),
            CoreError::Quarantined { .. } => {
                Some("this skill is pending security review; it cannot be installed yet")
            }
            _ => None,
        }
    }
}
