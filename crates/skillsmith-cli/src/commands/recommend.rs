//! `skillsmith recommend` - contextual recommendations (spec §6.3 `recommend`).

use crate::output::Format;
use crate::stores::Stores;
use anyhow::Result;
use colored::Colorize;
use skillsmith_core::recommend::recommend as recommend_fn;
use skillsmith_core::{CoreError, RecommendationContext};
use std::collections::HashSet;

pub async fn execute(
    role: Option<String>,
    project_description: Option<String>,
    installed: Vec<String>,
    limit: usize,
    format: Format,
) -> Result<(), CoreError> {
    let ctx = RecommendationContext {
        project_description,
        installed_skills: installed.into_iter().collect::<HashSet<_>>(),
        role,
        stack: None,
    };

    let stores = Stores::open(None)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;
    let response = recommend_fn(&stores.catalog, &stores.quarantine, &ctx, limit).await?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        }
        Format::Compact => {
            for rec in &response.recommendations {
                println!("{}\t{}", rec.skill_id, rec.quality_score);
            }
        }
        Format::Rich => {
            if response.recommendations.is_empty() {
                println!("{} No recommendations for this context", "!".yellow());
            } else {
                println!(
                    "{} {} recommendation(s) from {} candidate(s)",
                    "→".cyan(),
                    response.recommendations.len(),
                    response.candidates_considered
                );
                println!();
                for rec in &response.recommendations {
                    println!(
                        "  {} score={} — {}",
                        rec.skill_id.cyan().bold(),
                        rec.quality_score,
                        rec.reason.dimmed()
                    );
                }
                if response.overlap_filtered > 0 || response.role_filtered > 0 {
                    println!();
                    println!(
                        "  {} {} filtered by trigger overlap, {} by role mismatch",
                        "Note:".dimmed(),
                        response.overlap_filtered,
                        response.role_filtered
                    );
                }
            }
        }
    }

    Ok(())
}
