//! Initialize a new kgqa project.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};

pub fn run(path: Option<PathBuf>) -> Result<()> {
    let base_path = match path {
        Some(p) => p,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    println!("{} Initializing kgqa project...", "→".blue());

    let data_dir = base_path.join(".kgqa");
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    println!("  {} Created {}", "✓".green(), data_dir.display());

    let config_path = base_path.join(CONFIG_FILE);
    if !config_path.exists() {
        Config::default().save(&config_path)?;
        println!("  {} Created {}", "✓".green(), config_path.display());
    } else {
        println!("  {} {} already exists", "•".yellow(), config_path.display());
    }

    let gitignore_path = data_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, "graph.db\nreports/\n")?;
        println!("  {} Created {}", "✓".green(), gitignore_path.display());
    }

    println!();
    println!("{} kgqa project initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  {} set OPENAI_API_KEY (or pick another [llm] backend)", "1.".blue());
    println!("  {} kgqa build --corpus dev-v1.1.json", "2.".blue());
    println!("  {} kgqa ask \"your question\"", "3.".blue());
    println!("  {} kgqa eval --limit 20", "4.".blue());

    Ok(())
}
