//! Per-question pipeline: anchor resolution, then context expansion.
//!
//! A pipeline owns one store session and one backend handle. Building the
//! graph flushes the store, so callers must not run [`QaPipeline::build`]
//! while questions are in flight.

use crate::anchor::AnchorResolver;
use crate::builder::{BuildReport, KnowledgeGraphBuilder};
use crate::config::RetrievalConfig;
use crate::expander::ContextExpander;
use crate::synthesizer::AnswerSynthesizer;
use crate::validator::AnswerValidator;
use kgqa_core::error::Result;
use kgqa_core::types::AnswerAttempt;
use kgqa_llm::DynLlmBackend;
use kgqa_runtime::backend::DynGraphStore;
use tracing::instrument;

pub struct QaPipeline {
    backend: DynLlmBackend,
    store: DynGraphStore,
    config: RetrievalConfig,
}

impl QaPipeline {
    /// Assemble a pipeline, rejecting unusable retrieval settings.
    pub fn new(backend: DynLlmBackend, store: DynGraphStore, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            store,
            config,
        })
    }

    pub fn backend(&self) -> &DynLlmBackend {
        &self.backend
    }

    pub fn store(&self) -> &DynGraphStore {
        &self.store
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn builder(&self) -> KnowledgeGraphBuilder {
        KnowledgeGraphBuilder::new(self.backend.clone(), self.store.clone()).with_config(&self.config)
    }

    pub fn resolver(&self) -> AnchorResolver {
        AnchorResolver::new(self.backend.clone())
    }

    pub fn expander(&self) -> ContextExpander {
        ContextExpander::new(
            self.store.clone(),
            AnswerSynthesizer::new(self.backend.clone()),
        )
        .with_config(&self.config)
    }

    pub fn validator(&self) -> AnswerValidator {
        AnswerValidator::new(self.backend.clone())
    }

    /// Replace the graph with one extracted from `corpus`.
    pub async fn build(&self, corpus: &str) -> Result<BuildReport> {
        self.builder().build(corpus).await
    }

    /// Answer one question from the current graph.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn ask(&self, question: &str) -> Result<AnswerAttempt> {
        let anchor = self.resolver().resolve_in(self.store.as_ref(), question).await?;
        self.expander().expand(question, &anchor).await
    }

    /// Judge an attempt against reference answers. Unanswered attempts are wrong.
    pub async fn validate(&self, attempt: &AnswerAttempt, expected: &[String]) -> Result<bool> {
        match attempt.answer.as_deref() {
            Some(answer) if attempt.success => self.validator().validate(answer, expected).await,
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgqa_core::error::{KgError, ResolutionError};
    use kgqa_llm::MockBackend;
    use kgqa_runtime::memory::MemoryGraphStore;
    use std::sync::Arc;

    #[test]
    fn invalid_config_is_rejected() {
        let result = QaPipeline::new(
            Arc::new(MockBackend::new()),
            Arc::new(MemoryGraphStore::new()),
            RetrievalConfig::default().with_start_radius(0),
        );
        assert!(matches!(result, Err(KgError::Config(_))));
    }

    #[tokio::test]
    async fn ask_on_empty_graph_fails_resolution() {
        let pipeline = QaPipeline::new(
            Arc::new(MockBackend::new()),
            Arc::new(MemoryGraphStore::new()),
            RetrievalConfig::default(),
        )
        .unwrap();

        let err = pipeline.ask("Who won?").await.unwrap_err();
        assert!(matches!(
            err,
            KgError::Resolution(ResolutionError::EmptyInventory)
        ));
    }
}
