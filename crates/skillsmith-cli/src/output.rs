//! Shared output formatting and exit-code mapping for the CLI (spec §6.4).

use skillsmith_core::{CoreError, ErrorKind};
use std::str::FromStr;

/// Output format shared across commands: full human-readable, a terse
/// one-line-per-result form, or machine-readable JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Rich,
    Compact,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rich" => Ok(Format::Rich),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format: {other} (expected rich, compact, or json)")),
        }
    }
}

/// Maps a `CoreError` onto the exit codes spec §6.4 defines: 1 generic
/// error, 2 invalid args, 3 quarantined, 4 upstream unavailable.
pub fn exit_code(err: &CoreError) -> i32 {
    match err.kind() {
        ErrorKind::Input => 2,
        ErrorKind::UpstreamTransient => 4,
        ErrorKind::Quarantine => 3,
        ErrorKind::UpstreamPermanent
        | ErrorKind::Policy
        | ErrorKind::Storage
        | ErrorKind::Concurrency => 1,
    }
}

/// Prints a `CoreError` to stderr, including its remediation hint when one
/// is known, and returns the exit code the process should use.
pub fn report_error(err: &CoreError) -> i32 {
    use colored::Colorize;
    eprintln!("{} {}", "Error:".red().bold(), err);
    if let Some(hint) = err.remediation_hint() {
        eprintln!("  {} {}", "Hint:".dimmed(), hint);
    }
    exit_code(err)
}
