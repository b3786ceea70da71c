//! `skillsmith remove` - delete a skill from the local catalog (spec §6.4).

use crate::stores::Stores;
use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use skillsmith_core::CoreError;

pub async fn execute(skill_id: &str, force: bool) -> Result<(), CoreError> {
    let stores = Stores::open(None)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;

    let skill = stores.catalog.get_skill(skill_id).await?.ok_or(CoreError::NotFound)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove {} from the catalog?", skill.skill_id))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("{} Cancelled", "!".yellow());
            return Ok(());
        }
    }

    stores.catalog.delete_skill(skill_id).await?;
    stores.audit.append("skill_removed", serde_json::json!({"skill_id": skill_id}))?;

    println!("{} Removed {}", "✓".green().bold(), skill.skill_id);
    Ok(())
}
