//! kgqa Web - HTTP API over graph construction and question answering.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

pub use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "kgqa-web")]
#[command(about = "kgqa Web - Graph-grounded question answering over HTTP")]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Path to SQLite database (default: in-memory graph)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Neo4j Bolt URI (overrides --db)
    #[cfg(feature = "neo4j")]
    #[arg(long, env = "NEO4J_URI")]
    neo4j_uri: Option<String>,

    #[cfg(feature = "neo4j")]
    #[arg(long, env = "NEO4J_USER", default_value = "neo4j")]
    neo4j_user: String,

    #[cfg(feature = "neo4j")]
    #[arg(long, env = "NEO4J_PASSWORD", default_value = "")]
    neo4j_password: String,

    /// Generative backend: openai, claude or ollama
    #[arg(short, long, env = "KGQA_BACKEND", default_value = "openai")]
    backend: String,

    /// Model name (default: provider default)
    #[arg(short, long, env = "KGQA_MODEL")]
    model: Option<String>,

    /// Provider endpoint override
    #[arg(long, env = "KGQA_ENDPOINT")]
    endpoint: Option<String>,

    /// Stop expanding past this radius (default: stall detection only)
    #[arg(long)]
    max_radius: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    // Create app state
    let state = AppState::from_cli(&cli).await?;
    tracing::info!(%addr, backend = %cli.backend, "Starting kgqa web API");

    // Build router
    let app = routes::create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    state.close().await?;
    tracing::info!("Store session closed");
    Ok(())
}
