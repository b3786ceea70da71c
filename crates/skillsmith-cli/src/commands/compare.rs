//! `skillsmith compare` - head-to-head comparison (spec §6.3 `compare`).

use crate::output::Format;
use crate::stores::Stores;
use anyhow::Result;
use colored::Colorize;
use skillsmith_core::{compare, CompareWinner, CoreError};

pub async fn execute(skill_a: &str, skill_b: &str, format: Format) -> Result<(), CoreError> {
    let stores = Stores::open(None)
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;
    let response = compare(&stores.catalog, skill_a, skill_b).await?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        }
        Format::Compact => {
            println!("{:?}\t{}", response.winner, response.recommendation);
        }
        Format::Rich => {
            println!("  {}  vs  {}", response.a.skill_id.cyan().bold(), response.b.skill_id.cyan().bold());
            println!();
            for diff in &response.differences {
                println!("  {:<16} {} / {}", diff.dimension.bold(), diff.a, diff.b);
            }
            println!();
            let winner = match response.winner {
                CompareWinner::A => response.a.skill_id.clone(),
                CompareWinner::B => response.b.skill_id.clone(),
                CompareWinner::Tie => "tie".to_string(),
            };
            println!("{} {} — {}", "Winner:".bold(), winner.green(), response.recommendation.dimmed());
        }
    }

    Ok(())
}
