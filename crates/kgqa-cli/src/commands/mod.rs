//! CLI command implementations.

pub mod ask;
pub mod build;
pub mod eval;
pub mod init;
pub mod nodes;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use kgqa::prelude::*;
use std::path::PathBuf;

use crate::config::Config;

/// Open the configured backend and store as one pipeline.
pub async fn open_pipeline(config: &Config) -> Result<QaPipeline> {
    let backend = create_backend(
        config.llm.backend,
        config.llm.to_llm_config(),
        config.llm.endpoint.as_deref(),
    )
    .with_context(|| format!("Failed to create {} backend", config.llm.backend))?;

    let store = create_store(&config.store.to_store_config()?)
        .await
        .with_context(|| format!("Failed to open {} store", config.store.backend))?;

    Ok(QaPipeline::new(backend, store, config.retrieval.clone())?)
}

/// Disconnect the pipeline's store session, then hand back `result`.
///
/// A failed disconnect is an error only when the command itself succeeded.
pub async fn close_pipeline<T>(pipeline: &QaPipeline, result: Result<T>) -> Result<T> {
    let closed = pipeline.store().disconnect().await;
    match result {
        Ok(value) => {
            closed.with_context(|| format!("Failed to close {} store", pipeline.store().name()))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(close_err) = closed {
                tracing::warn!(error = %close_err, "Store did not close cleanly");
            }
            Err(e)
        }
    }
}

/// Load the corpus named on the command line, falling back to `[corpus]`.
pub fn load_configured_corpus(
    config: &Config,
    path: Option<PathBuf>,
    article: Option<usize>,
) -> Result<Corpus> {
    let Some(path) = path.or_else(|| config.corpus.path.clone()) else {
        bail!(
            "No corpus given. Pass {} or set [corpus] path in kgqa.toml.",
            "--corpus".cyan()
        );
    };
    let article = article.or(config.corpus.article);
    load_corpus(&path, article).with_context(|| format!("Failed to load corpus: {}", path.display()))
}

/// Fail early when there is no graph to query.
pub async fn require_graph(pipeline: &QaPipeline) -> Result<()> {
    if pipeline.store().node_count().await? == 0 {
        bail!(
            "The graph is empty. Run {} first (the memory store does not persist between runs).",
            "kgqa build".cyan()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn memory_pipeline() -> QaPipeline {
        QaPipeline::new(
            Arc::new(MockBackend::new()),
            Arc::new(MemoryGraphStore::new()),
            RetrievalConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn close_disconnects_the_store() {
        let pipeline = memory_pipeline();
        assert_eq!(close_pipeline(&pipeline, Ok(3)).await.unwrap(), 3);
        assert_eq!(
            pipeline.store().list_nodes().await.unwrap_err(),
            StoreError::Disconnected
        );
    }

    #[tokio::test]
    async fn close_keeps_the_command_error() {
        let pipeline = memory_pipeline();
        let err = close_pipeline::<()>(&pipeline, Err(anyhow::anyhow!("question failed")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "question failed");
        assert!(pipeline.store().node_count().await.is_err());
    }

    #[tokio::test]
    async fn close_fails_when_already_disconnected() {
        let pipeline = memory_pipeline();
        pipeline.store().disconnect().await.unwrap();
        assert!(close_pipeline(&pipeline, Ok(())).await.is_err());
    }
}
