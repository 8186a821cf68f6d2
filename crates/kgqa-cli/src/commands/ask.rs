//! Answer a single question.

use anyhow::Result;
use colored::Colorize;
use kgqa::prelude::*;

use super::{close_pipeline, open_pipeline, require_graph};
use crate::config::Config;

pub async fn run(question: &str, expected: &[String]) -> Result<()> {
    let config = Config::load()?;
    let pipeline = open_pipeline(&config).await?;
    let result = answer(&pipeline, question, expected).await;
    close_pipeline(&pipeline, result).await
}

async fn answer(pipeline: &QaPipeline, question: &str, expected: &[String]) -> Result<()> {
    require_graph(pipeline).await?;

    println!("{} {}", "→".blue(), question.cyan().bold());
    let attempt = pipeline.ask(question).await?;

    match (&attempt.outcome, attempt.answer.as_deref()) {
        (ExpansionOutcome::Converged, Some(answer)) => {
            println!("  {} {}", "✓".green(), answer.white().bold());
        }
        _ => {
            println!("  {} No answer ({})", "•".yellow(), attempt.outcome);
        }
    }
    println!(
        "      anchor {}  radius {}  iterations {}  context {} nodes",
        attempt.anchor_id.cyan(),
        attempt.radius,
        attempt.iterations,
        attempt.neighborhood.len()
    );

    if !expected.is_empty() {
        let verdict = pipeline.validate(&attempt, expected).await?;
        let label = if verdict {
            "correct".green().bold()
        } else {
            "incorrect".red().bold()
        };
        println!("  {} Validator: {}", "→".blue(), label);
    }

    Ok(())
}
