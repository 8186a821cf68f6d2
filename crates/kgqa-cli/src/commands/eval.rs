//! Evaluate the corpus question set.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use kgqa::prelude::*;
use std::path::PathBuf;

use super::{close_pipeline, load_configured_corpus, open_pipeline, require_graph};
use crate::config::{data_dir, Config};

pub async fn run(
    corpus: Option<PathBuf>,
    limit: Option<usize>,
    output: Option<PathBuf>,
    rebuild: bool,
) -> Result<()> {
    let config = Config::load()?;
    let corpus = load_configured_corpus(&config, corpus, None)?;
    if corpus.questions.is_empty() {
        bail!("Corpus {} has no questions", corpus.name);
    }

    let pipeline = open_pipeline(&config).await?;
    let result = evaluate(&pipeline, &corpus, limit, output, rebuild).await;
    close_pipeline(&pipeline, result).await
}

async fn evaluate(
    pipeline: &QaPipeline,
    corpus: &Corpus,
    limit: Option<usize>,
    output: Option<PathBuf>,
    rebuild: bool,
) -> Result<()> {
    if rebuild {
        println!("{} Rebuilding graph from {}...", "→".blue(), corpus.name.cyan());
        let report = pipeline.build(&corpus.text).await?;
        println!(
            "  {} {} statements applied, {} skipped",
            "✓".green(),
            report.applied,
            report.skipped.len()
        );
    }
    require_graph(pipeline).await?;

    let questions = match limit {
        Some(n) => &corpus.questions[..n.min(corpus.questions.len())],
        None => &corpus.questions[..],
    };

    println!(
        "{} Evaluating {} questions ({} at a time)...",
        "→".blue(),
        questions.len().to_string().cyan(),
        pipeline.config().concurrency
    );

    let pb = ProgressBar::new(questions.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = pipeline
        .evaluate(&corpus.name, questions, |q| {
            pb.set_message(if q.verdict { "✓" } else { "✗" });
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    for q in &report.questions {
        let mark = match (&q.error, q.verdict) {
            (Some(_), _) => "!".red(),
            (None, true) => "✓".green(),
            (None, false) => "✗".yellow(),
        };
        println!(
            "  {} {} {}",
            mark,
            q.question,
            format!("→ {}", q.answer.as_deref().unwrap_or("-")).dimmed()
        );
    }

    println!();
    println!(
        "{} Accuracy {} ({} correct, {} answered, {} errors, {} total)",
        "✓".green(),
        format!("{:.1}%", report.accuracy * 100.0).cyan().bold(),
        report.correct,
        report.answered,
        report.errors,
        report.total
    );

    let path = match output {
        Some(path) => path,
        None => {
            let dir = data_dir()?.join("reports");
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            dir.join(format!("{}.json", report.run_id))
        }
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    println!("  Report written to {}", path.display().to_string().cyan());

    Ok(())
}
