use clap::{Parser, Subcommand};
use colored::Colorize;
use skillsmith_cli::commands;
use skillsmith_cli::output::Format;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "skillsmith")]
#[command(about = "Registry and discovery engine for agent skills", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog by text and/or filters
    Search {
        /// Free-text query
        text: Option<String>,

        /// Restrict to a category
        #[arg(long)]
        category: Option<String>,

        /// Restrict to a trust tier (local, unknown, experimental, community, curated, verified)
        #[arg(long)]
        tier: Option<String>,

        /// Minimum composite score (0-100)
        #[arg(long)]
        min_score: Option<u32>,

        /// Maximum risk score (0-100)
        #[arg(long)]
        max_risk: Option<f64>,

        /// Only return skills whose last scan was safe
        #[arg(long)]
        safe_only: bool,

        /// Maximum results to return
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Offset into the result set
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Output format (rich, compact, json)
        #[arg(short, long, default_value = "rich")]
        format: String,
    },

    /// Recommend skills for a project context
    Recommend {
        /// Caller's declared role (e.g. backend, frontend, devops)
        #[arg(long)]
        role: Option<String>,

        /// Free-text project description
        #[arg(long)]
        project: Option<String>,

        /// Skill ids already installed (repeatable)
        #[arg(long = "installed")]
        installed: Vec<String>,

        /// Maximum recommendations to return
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Output format (rich, compact, json)
        #[arg(short, long, default_value = "rich")]
        format: String,
    },

    /// Validate a skill document's shape
    Validate {
        /// Path to the Markdown document
        path: PathBuf,

        /// Enforce strict mode (frontmatter name required, etc.)
        #[arg(long)]
        strict: bool,

        /// Output format (rich, compact, json)
        #[arg(short, long, default_value = "rich")]
        format: String,
    },

    /// Compare two catalog skills head to head
    Compare {
        /// First skill id
        skill_a: String,

        /// Second skill id
        skill_b: String,

        /// Output format (rich, compact, json)
        #[arg(short, long, default_value = "rich")]
        format: String,
    },

    /// Run a differential or full refresh against upstream
    Sync {
        /// Full re-scan instead of the default differential resume
        #[arg(long)]
        force: bool,

        /// Fetch and scan but do not persist catalog or checkpoint changes
        #[arg(long)]
        dry_run: bool,

        /// Output format (rich, compact, json)
        #[arg(short, long, default_value = "rich")]
        format: String,
    },

    /// List skills in the local catalog
    #[command(alias = "ls")]
    List {
        /// Restrict to a category
        #[arg(long)]
        category: Option<String>,

        /// Restrict to a trust tier
        #[arg(long)]
        tier: Option<String>,

        /// Output format (rich, compact, json)
        #[arg(short, long, default_value = "rich")]
        format: String,
    },

    /// Remove a skill from the local catalog
    #[command(alias = "rm")]
    Remove {
        /// Skill id (author/name)
        skill_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Scaffold a new skill document
    Init {
        /// Skill name
        name: String,

        /// Output path (default: ./SKILL.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate, scan, and catalog a local skill document
    Publish {
        /// Path to the Markdown document
        path: PathBuf,

        /// Author id to attribute the skill to (default: from frontmatter)
        #[arg(long)]
        author: Option<String>,

        /// Overwrite an existing catalog entry with the same id
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let exit_code = run(cli.command).await;
    std::process::exit(exit_code);
}

async fn run(command: Commands) -> i32 {
    let result: Result<(), skillsmith_core::CoreError> = match command {
        Commands::Search { text, category, tier, min_score, max_risk, safe_only, limit, offset, format } => {
            match parse_format(&format) {
                Ok(format) => commands::search::execute(text, category, tier, min_score, max_risk, safe_only, limit, offset, format).await,
                Err(e) => return invalid_args(&e),
            }
        }
        Commands::Recommend { role, project, installed, limit, format } => match parse_format(&format) {
            Ok(format) => commands::recommend::execute(role, project, installed, limit, format).await,
            Err(e) => return invalid_args(&e),
        },
        Commands::Validate { path, strict, format } => match parse_format(&format) {
            Ok(format) => match commands::validate::execute(&path, strict, format) {
                Ok(valid) => return if valid { 0 } else { 1 },
                Err(e) => {
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                    return 1;
                }
            },
            Err(e) => return invalid_args(&e),
        },
        Commands::Compare { skill_a, skill_b, format } => match parse_format(&format) {
            Ok(format) => commands::compare::execute(&skill_a, &skill_b, format).await,
            Err(e) => return invalid_args(&e),
        },
        Commands::Sync { force, dry_run, format } => match parse_format(&format) {
            Ok(format) => commands::sync::execute(force, dry_run, format).await,
            Err(e) => return invalid_args(&e),
        },
        Commands::List { category, tier, format } => match parse_format(&format) {
            Ok(format) => commands::list::execute(category, tier, format).await,
            Err(e) => return invalid_args(&e),
        },
        Commands::Remove { skill_id, force } => commands::remove::execute(&skill_id, force).await,
        Commands::Init { name, output, force } => {
            return match commands::init::execute(&name, output.as_deref(), force) {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                    1
                }
            };
        }
        Commands::Publish { path, author, force } => commands::publish::execute(&path, author, force).await,
    };

    match result {
        Ok(()) => 0,
        Err(e) => skillsmith_cli::output::report_error(&e),
    }
}

fn parse_format(raw: &str) -> Result<Format, String> {
    Format::from_str(raw)
}

fn invalid_args(message: &str) -> i32 {
    eprintln!("{} {}", "Error:".red().bold(), message);
    2
}
