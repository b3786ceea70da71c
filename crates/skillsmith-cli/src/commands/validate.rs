//! `skillsmith validate` - document-shape checks (spec §6.3 `validate`).
//!
//! Unlike every other command, `validate` never reports `valid: false` as a
//! process error — spec §6.3 gives it no error kinds at all, so a malformed
//! document is a successful response carrying its reasons.

use crate::output::Format;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use skillsmith_core::validate::{validate, ValidationOptions};

#[derive(Serialize)]
struct ValidateReport {
    valid: bool,
    reasons: Vec<String>,
}

pub fn execute(path: &std::path::Path, strict: bool, format: Format) -> Result<bool> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let options = ValidationOptions { strict, ..ValidationOptions::default() };

    let report = match validate(&bytes, &options) {
        Ok(_) => ValidateReport { valid: true, reasons: vec![] },
        Err(e) => ValidateReport { valid: false, reasons: vec![e.to_string()] },
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Compact => println!("{}\t{}", report.valid, report.reasons.join("; ")),
        Format::Rich => {
            if report.valid {
                println!("{} {} is valid", "✓".green().bold(), path.display());
            } else {
                println!("{} {} is invalid", "✗".red().bold(), path.display());
                for reason in &report.reasons {
                    println!("  {} {}", "-".dimmed(), reason);
                }
            }
        }
    }

    Ok(report.valid)
}
