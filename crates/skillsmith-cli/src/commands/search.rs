//! `skillsmith search` - the search tool surface (spec §6.3 `search`) over
//! the local catalog.

use crate::output::Format;
use crate::stores::Stores;
use anyhow::Result;
use colored::Colorize;
use skillsmith_core::{CoreError, Filters, Query, SearchEngine, TrustTier};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    text: Option<String>,
    category: Option<String>,
    tier: Option<String>,
    min_score: Option<u32>,
    max_risk: Option<f64>,
    safe_only: bool,
    limit: usize,
    offset: usize,
    format: Format,
) -> Result<(), CoreError> {
    let trust_tier = match tier {
        Some(raw) => Some(raw.parse::<TrustTier>().map_err(CoreError::InvalidFilter)?),
        None => None,
    };

    let filters = Filters {
        category,
        trust_tier,
        min_score,
        max_risk,
        safe_only: if safe_only { Some(true) } else { None },
        compatibility: None,
    };
    let query = Query { text, filters, limit, offset };

    let stores = Stores::open(None)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;
    let engine = SearchEngine::new(&stores.catalog, &stores.quarantine);
    let response = engine.search(&query, &[]).await?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        }
        Format::Compact => {
            for item in &response.results {
                println!("{}\t{}\t{:.1}", item.skill_id, item.trust_tier, item.score);
            }
        }
        Format::Rich => {
            if response.results.is_empty() {
                println!("{} No skills matched", "!".yellow());
            } else {
                println!(
                    "{} {} of {} result(s) ({}ms)",
                    "→".cyan(),
                    response.results.len(),
                    response.total,
                    response.timing_ms
                );
                println!();
                for item in &response.results {
                    println!(
                        "  {} {} [{}] score={:.1}",
                        item.skill_id.cyan().bold(),
                        item.description.dimmed(),
                        format!("{}", item.trust_tier).yellow(),
                        item.score
                    );
                }
            }
        }
    }

    Ok(())
}
