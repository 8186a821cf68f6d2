//! List the nodes in the current graph.

use anyhow::Result;
use colored::Colorize;
use kgqa::prelude::*;

use super::{close_pipeline, open_pipeline};
use crate::config::Config;

pub async fn run(json: bool) -> Result<()> {
    let config = Config::load()?;
    let pipeline = open_pipeline(&config).await?;
    let result = list(&pipeline, json).await;
    close_pipeline(&pipeline, result).await
}

async fn list(pipeline: &QaPipeline, json: bool) -> Result<()> {
    let nodes = pipeline.store().list_nodes().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    if nodes.is_empty() {
        println!("{} The graph is empty", "•".yellow());
        return Ok(());
    }

    for node in &nodes {
        println!(
            "  {} {} {}",
            node.id.blue(),
            node.display_name().white().bold(),
            format!(":{}", node.labels.join(":")).dimmed()
        );
    }
    println!();
    println!("{} {} nodes", "✓".green(), nodes.len().to_string().cyan());

    Ok(())
}
