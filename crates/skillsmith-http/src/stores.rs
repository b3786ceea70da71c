//! Opens the persisted state (spec §6.1) the server needs, from the
//! process-wide `CoreConfig` snapshot.

use anyhow::{Context, Result};
use skillsmith_core::{AuditLog, CatalogStore, CoreConfig, QuarantineStore};

pub struct Stores {
    pub catalog: CatalogStore,
    pub quarantine: QuarantineStore,
    pub audit: AuditLog,
    pub config: CoreConfig,
}

impl Stores {
    pub async fn open(config_path: Option<&std::path::Path>) -> Result<Self> {
        let config = CoreConfig::load(config_path).context("failed to load configuration")?;

        let catalog_path = config.catalog_db_path();
        if let Some(parent) = catalog_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create catalog directory")?;
        }
        let quarantine_path = config.quarantine_db_path();
        if let Some(parent) = quarantine_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create quarantine directory")?;
        }

        let catalog = CatalogStore::open(&format!("sqlite://{}", catalog_path.display()))
            .await
            .context("failed to open catalog store")?;
        let quarantine = QuarantineStore::open(&format!("sqlite://{}", quarantine_path.display()))
            .await
            .context("failed to open quarantine store")?;
        let audit = AuditLog::open(&config.audit_path()).context("failed to open audit log")?;

        Ok(Self { catalog, quarantine, audit, config })
    }
}
