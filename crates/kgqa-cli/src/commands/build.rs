//! Build the knowledge graph from a corpus.

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use kgqa::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

use super::{close_pipeline, load_configured_corpus, open_pipeline};
use crate::config::Config;

pub async fn run(
    corpus: Option<PathBuf>,
    article: Option<usize>,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let config = Config::load()?;
    let corpus = load_configured_corpus(&config, corpus, article)?;
    let pipeline = open_pipeline(&config).await?;
    let result = extract(&pipeline, &corpus, dry_run, verbose).await;
    close_pipeline(&pipeline, result).await
}

async fn extract(pipeline: &QaPipeline, corpus: &Corpus, dry_run: bool, verbose: bool) -> Result<()> {
    println!(
        "{} Extracting graph from {} ({} chars, {} questions)...",
        "→".blue(),
        corpus.name.cyan(),
        corpus.text.len(),
        corpus.questions.len()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("waiting for {}", pipeline.backend().name()));

    if dry_run {
        let statements = pipeline.builder().generate(&corpus.text).await;
        spinner.finish_and_clear();
        let statements = statements?;
        for (i, statement) in statements.iter().enumerate() {
            println!("{} {}", format!("{:>3}.", i).blue(), statement);
        }
        println!();
        println!(
            "{} {} statements generated (store untouched)",
            "✓".green(),
            statements.len().to_string().cyan()
        );
        return Ok(());
    }

    let report = pipeline.build(&corpus.text).await;
    spinner.finish_and_clear();
    let report = report?;

    println!(
        "{} Applied {} of {} statements to the {} store",
        "✓".green(),
        report.applied.to_string().cyan(),
        report.generated.len(),
        pipeline.store().name()
    );

    if !report.skipped.is_empty() {
        println!(
            "  {} {} statements skipped",
            "•".yellow(),
            report.skipped.len()
        );
        if verbose {
            for skipped in &report.skipped {
                println!("    {} {}", format!("#{}", skipped.index).yellow(), skipped.statement);
                println!("       {}", skipped.reason.dimmed());
            }
        }
    }

    let nodes = pipeline.store().node_count().await?;
    println!("  {} nodes in graph", nodes.to_string().cyan());

    Ok(())
}
