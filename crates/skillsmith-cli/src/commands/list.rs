//! `skillsmith list` - browse the local catalog (spec §6.4; catalog-side
//! counterpart to `search` with no query text, always unfiltered by default).

use crate::output::Format;
use crate::stores::Stores;
use anyhow::Result;
use colored::Colorize;
use skillsmith_core::{CoreError, Filters, TrustTier};

pub async fn execute(category: Option<String>, tier: Option<String>, format: Format) -> Result<(), CoreError> {
    let trust_tier = match tier {
        Some(raw) => Some(raw.parse::<TrustTier>().map_err(CoreError::InvalidFilter)?),
        None => None,
    };
    let filters = Filters { category, trust_tier, ..Filters::default() };

    let stores = Stores::open(None)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;
    let skills = stores.catalog.filter_browse(&filters).await?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&skills).unwrap_or_default());
        }
        Format::Compact => {
            for skill in &skills {
                println!("{}\t{}\t{}", skill.skill_id, skill.trust_tier, skill.composite_score());
            }
        }
        Format::Rich => {
            if skills.is_empty() {
                println!("{} No skills in the catalog yet", "!".yellow());
                println!("Run {} to pull skills from upstream", "skillsmith sync".cyan());
            } else {
                println!("{} {} skill(s) in the catalog", "→".cyan(), skills.len());
                println!();
                println!("  {:<30} {:<14} {:<10} {}", "SKILL".bold(), "TIER".bold(), "SCORE".bold(), "CATEGORY".bold());
                println!("  {}", "─".repeat(70).dimmed());
                for skill in &skills {
                    println!(
                        "  {:<30} {:<14} {:<10} {}",
                        skill.skill_id.cyan(),
                        format!("{}", skill.trust_tier).yellow(),
                        skill.composite_score(),
                        skill.category.as_deref().unwrap_or("-").dimmed()
                    );
                }
            }
        }
    }

    Ok(())
}
