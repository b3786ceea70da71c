//! `skillsmith sync` - the differential refresh loop (spec §6.3 `sync`, C9).

use crate::output::Format;
use crate::stores::Stores;
use anyhow::Result;
use colored::Colorize;
use skillsmith_core::{AuthMode, CoreError, GitHubProvider, SyncMode, SyncOptions};

pub async fn execute(full: bool, dry_run: bool, format: Format) -> Result<(), CoreError> {
    let stores = Stores::open(None)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;

    let auth = AuthMode::select(
        stores.config.auth.app_id.as_deref(),
        stores.config.auth.app_installation_id.as_deref(),
        stores.config.auth.app_private_key.as_deref(),
        stores.config.auth.personal_access_token.as_deref(),
    );
    let provider = GitHubProvider::new(auth);

    let options = SyncOptions {
        mode: if full { SyncMode::Full } else { SyncMode::Differential },
        dry_run,
        ..SyncOptions::default()
    };
    let checkpoint_path = stores.config.sync_state_path();

    let report = skillsmith_core::sync::sync(
        &provider,
        &stores.catalog,
        &stores.quarantine,
        &stores.audit,
        &checkpoint_path,
        &options,
    )
    .await?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        }
        Format::Compact => {
            println!(
                "{}\t{}\t{}\t{}",
                report.added, report.updated, report.unchanged, report.errors
            );
        }
        Format::Rich => {
            println!(
                "{} added={} updated={} unchanged={} errors={} ({}ms)",
                "→".cyan(),
                report.added.to_string().green(),
                report.updated.to_string().yellow(),
                report.unchanged,
                report.errors.to_string().red(),
                report.duration_ms
            );
            if dry_run {
                println!("  {} dry run: no checkpoint or catalog changes were persisted", "Note:".dimmed());
            }
        }
    }

    Ok(())
}
