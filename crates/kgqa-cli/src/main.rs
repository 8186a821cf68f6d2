//! kgqa CLI - build knowledge graphs and answer questions over them.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kgqa")]
#[command(author, version, about = "kgqa - Graph-grounded question answering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new kgqa project
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Build the knowledge graph from a corpus (replaces the current graph)
    Build {
        /// Corpus file: SQuAD JSON or plain text (default: [corpus] path)
        #[arg(short, long)]
        corpus: Option<PathBuf>,

        /// Article index within a SQuAD file
        #[arg(short, long)]
        article: Option<usize>,

        /// Print the generated statements without touching the store
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a question from the current graph
    Ask {
        /// The question
        question: String,

        /// Reference answer to validate against (repeatable)
        #[arg(short, long)]
        expected: Vec<String>,
    },

    /// Evaluate every question of the corpus
    Eval {
        /// Corpus file (default: [corpus] path)
        #[arg(short, long)]
        corpus: Option<PathBuf>,

        /// Only evaluate the first N questions
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write the full JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rebuild the graph from the corpus first
        #[arg(long)]
        rebuild: bool,
    },

    /// List the nodes in the current graph
    Nodes {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Build {
            corpus,
            article,
            dry_run,
        } => commands::build::run(corpus, article, dry_run, cli.verbose).await,
        Commands::Ask { question, expected } => commands::ask::run(&question, &expected).await,
        Commands::Eval {
            corpus,
            limit,
            output,
            rebuild,
        } => commands::eval::run(corpus, limit, output, rebuild).await,
        Commands::Nodes { json } => commands::nodes::run(json).await,
    }
}
