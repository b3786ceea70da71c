//! Persistent, append-only review queue with a multi-approval state
//! machine (C4).

use crate::errors::{CoreError, Result};
use crate::types::{Approval, QuarantineEntry, QuarantineStatus, Severity};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Filter for listing quarantine entries.
#[derive(Debug, Clone, Default)]
pub struct QuarantineFilter {
    pub status: Option<QuarantineStatus>,
    pub skill_id: Option<String>,
}

/// Capability gate for quarantine operations. Multi-approval-required
/// transitions need `Approve`; single-approval transitions need `Review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    Read,
    Review,
    Approve,
}

pub struct QuarantineStore {
    pool: SqlitePool,
}

impl QuarantineStore {
    pub async fn open(path: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(path)
            .map_err(|e| CoreError::Storage(e.to_string()))?
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
            CREATE TABLE IF NOT EXISTS quarantine_entries (
                id TEXT PRIMARY KEY,
                skill_id TEXT NOT NULL,
                reason TEXT NOT NULL,
                severity TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                required_approvals INTEGER NOT NULL,
                approvals_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_quarantine_skill ON quarantine_entries(skill_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Idempotent on `skill_id` while a non-terminal entry exists.
    #[instrument(skip(self))]
    pub async fn create(&self, skill_id: &str, reason: &str, severity: Severity) -> Result<QuarantineEntry> {
        if let Some(existing) = self.find_non_terminal(skill_id).await? {
            return Ok(existing);
        }

        let entry = QuarantineEntry {
            id: Uuid::new_v4().to_string(),
            skill_id: skill_id.to_string(),
            reason: reason.to_string(),
            severity,
            status: QuarantineStatus::Pending,
            created_at: Utc::now(),
            required_approvals: QuarantineEntry::required_approvals_for(severity),
            approvals: Vec::new(),
        };

        sqlx::query(
            "INSERT INTO quarantine_entries (id, skill_id, reason, severity, status, created_at, required_approvals, approvals_json) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.skill_id)
        .bind(&entry.reason)
        .bind(severity_str(severity))
        .bind(status_str(QuarantineStatus::Pending))
        .bind(entry.created_at.to_rfc3339())
        .bind(entry.required_approvals as i64)
        .bind(serde_json::to_string(&entry.approvals)?)
        .execute(&self.pool)
        .await?;

        info!(skill_id, entry_id = %entry.id, "quarantine entry created");
        Ok(entry)
    }

    async fn find_non_terminal(&self, skill_id: &str) -> Result<Option<QuarantineEntry>> {
        let row = sqlx::query("SELECT * FROM quarantine_entries WHERE skill_id = ? AND status = 'pending'")
            .bind(skill_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_entry).transpose()?)
    }

    pub async fn get(&self, entry_id: &str) -> Result<Option<QuarantineEntry>> {
        let row = sqlx::query("SELECT * FROM quarantine_entries WHERE id = ?")
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_entry).transpose()
    }

    pub async fn list(&self, filter: &QuarantineFilter) -> Result<Vec<QuarantineEntry>> {
        let rows = sqlx::query("SELECT * FROM quarantine_entries ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        let mut entries = rows.into_iter().map(row_to_entry).collect::<Result<Vec<_>>>()?;
        if let Some(status) = filter.status {
            entries.retain(|e| e.status == status);
        }
        if let Some(skill_id) = &filter.skill_id {
            entries.retain(|e| &e.skill_id == skill_id);
        }
        Ok(entries)
    }

    /// Fails if `reviewer_id` already approved this entry, or the entry is
    /// terminal. Advances to `approved` once the required count is reached.
    #[instrument(skip(self))]
    pub async fn add_approval(&self, entry_id: &str, reviewer_id: &str, note: Option<String>) -> Result<QuarantineEntry> {
        let mut entry = self.get(entry_id).await?.ok_or(CoreError::NotFound)?;

        if entry.approvals.iter().any(|a| a.reviewer_id == reviewer_id) {
            return Err(CoreError::AlreadyApproved);
        }
        if entry.status.is_terminal() {
            return Err(CoreError::TerminalState);
        }

        entry.approvals.push(Approval {
            reviewer_id: reviewer_id.to_string(),
            timestamp: Utc::now(),
            note,
        });

        if entry.approvals.len() as u32 >= entry.required_approvals {
            entry.status = QuarantineStatus::Approved;
            info!(entry_id, "quarantine entry approved");
        }

        self.persist_mutable(&entry).await?;
        Ok(entry)
    }

    #[instrument(skip(self))]
    pub async fn reject(&self, entry_id: &str, _reviewer_id: &str, _reason: &str) -> Result<QuarantineEntry> {
        let mut entry = self.get(entry_id).await?.ok_or(CoreError::NotFound)?;
        if entry.status.is_terminal() {
            return Err(CoreError::TerminalState);
        }
        entry.status = QuarantineStatus::Rejected;
        self.persist_mutable(&entry).await?;
        warn!(entry_id, "quarantine entry rejected");
        Ok(entry)
    }

    pub async fn cancel(&self, entry_id: &str) -> Result<QuarantineEntry> {
        let mut entry = self.get(entry_id).await?.ok_or(CoreError::NotFound)?;
        if entry.status.is_terminal() {
            return Err(CoreError::TerminalState);
        }
        entry.status = QuarantineStatus::Canceled;
        self.persist_mutable(&entry).await?;
        Ok(entry)
    }

    /// Persist only the fields the state machine is allowed to mutate
    /// (status, approvals) — entries are write-once otherwise (spec §3).
    async fn persist_mutable(&self, entry: &QuarantineEntry) -> Result<()> {
        sqlx::query("UPDATE quarantine_entries SET status = ?, approvals_json = ? WHERE id = ?")
            .bind(status_str(entry.status))
            .bind(serde_json::to_string(&entry.approvals)?)
            .bind(&entry.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Whether `skill_id` is currently hidden from search / blocked from
    /// install (spec §4.4 invariant).
    pub async fn is_quarantined(&self, skill_id: &str) -> Result<bool> {
        Ok(self.find_non_terminal(skill_id).await?.is_some())
    }
}

fn severity_str(s: Severity) -> &'static str {
    match s {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}

fn severity_from_str(s: &str) -> Severity {
    match s {
        "low" => Severity::Low,
        "medium" => Severity::Medium,
        "high" => Severity::High,
        _ => Severity::Critical,
    }
}

fn status_str(s: QuarantineStatus) -> &'static str {
    match s {
        QuarantineStatus::Pending => "pending",
        QuarantineStatus::Approved => "approved",
        QuarantineStatus::Rejected => "rejected",
        QuarantineStatus::Canceled => "canceled",
    }
}

fn status_from_str(s: &str) -> QuarantineStatus {
    match s {
        "approved" => QuarantineStatus::Approved,
        "rejected" => QuarantineStatus::Rejected,
        "canceled" => QuarantineStatus::Canceled,
        _ => QuarantineStatus::Pending,
    }
}

fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> Result<QuarantineEntry> {
    let approvals_json: String = row.try_get("approvals_json")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(QuarantineEntry {
        id: row.try_get("id")?,
        skill_id: row.try_get("skill_id")?,
        reason: row.try_get("reason")?,
        severity: severity_from_str(row.try_get::<String, _>("severity")?.as_str()),
        status: status_from_str(row.try_get::<String, _>("status")?.as_str()),
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| CoreError::Storage(e.to_string()))?
            .with_timezone(&Utc),
        required_approvals: row.try_get::<i64, _>("required_approvals")? as u32,
        approvals: serde_json::from_str(&approvals_json)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_is_idempotent_while_pending() {
        let store = QuarantineStore::in_memory().await.unwrap();
        let a = store.create("author/skill", "role injection", Severity::Critical).await.unwrap();
        let b = store.create("author/skill", "role injection", Severity::Critical).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.required_approvals, 2);
    }

    #[tokio::test]
    async fn requires_two_distinct_approvals_for_critical() {
        let store = QuarantineStore::in_memory().await.unwrap();
        let entry = store.create("author/skill", "critical finding", Severity::Critical).await.unwrap();

        let after_one = store.add_approval(&entry.id, "alice", None).await.unwrap();
        assert_eq!(after_one.status, QuarantineStatus::Pending);

        let after_two = store.add_approval(&entry.id, "bob", None).await.unwrap();
        assert_eq!(after_two.status, QuarantineStatus::Approved);
    }

    #[tokio::test]
    async fn duplicate_approval_rejected() {
        let store = QuarantineStore::in_memory().await.unwrap();
        let entry = store.create("author/skill", "finding", Severity::High).await.unwrap();
        store.add_approval(&entry.id, "alice", None).await.unwrap();
        let err = store.add_approval(&entry.id, "alice", None).await;
        assert!(matches!(err, Err(CoreError::AlreadyApproved)));
    }

    #[tokio::test]
    async fn terminal_state_rejects_further_approval() {
        let store = QuarantineStore::in_memory().await.unwrap();
        let entry = store.create("author/skill", "finding", Severity::Low).await.unwrap();
        store.add_approval(&entry.id, "alice", None).await.unwrap();
        let err = store.add_approval(&entry.id, "bob", None).await;
        assert!(matches!(err, Err(CoreError::TerminalState)));
    }

    #[tokio::test]
    async fn quarantine_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quarantine.db");
        let url = format!("sqlite://{}", path.display());

        let entry_id = {
            let store = QuarantineStore::open(&url).await.unwrap();
            let entry = store.create("author/skill", "finding", Severity::High).await.unwrap();
            entry.id
        };

        let store = QuarantineStore::open(&url).await.unwrap();
        let entry = store.get(&entry_id).await.unwrap().expect("entry should survive reopen");
        assert_eq!(entry.status, QuarantineStatus::Pending);
    }
}
