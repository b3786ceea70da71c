//! `skillsmith init` - scaffold a new skill document (spec §6.4, §6.2).

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

pub fn execute(name: &str, output: Option<&Path>, force: bool) -> Result<()> {
    let output = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("SKILL.md"));

    if output.exists() && !force {
        println!("{} {} already exists", "!".yellow(), output.display());
        println!("   Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(&output, template(name))
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("{} Generated {}", "✓".green().bold(), output.display());
    println!();
    println!("{} Next steps:", "→".cyan());
    println!("   1. Fill in description, tags, and category in the frontmatter");
    println!("   2. Replace the placeholder sections with real guidance");
    println!("   3. Run {} to check it before publishing", "skillsmith validate".cyan());
    Ok(())
}

fn title_case(name: &str) -> String {
    name.split(['-', '_'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn template(name: &str) -> String {
    format!(
        "---\nname: {name}\ndescription: brief description of what this skill does\ntags: []\ncategory: \ntriggers: []\n---\n\n\
# {title}\n\n\
Brief description of what this skill does and its main purpose.\n\n\
## When to Use\n\n\
- Use case 1: describe when to reach for this skill\n\
- Use case 2: another scenario\n\n\
## Usage\n\n\
Describe the steps or tools this skill provides.\n",
        name = name,
        title = title_case(name),
    )
}
