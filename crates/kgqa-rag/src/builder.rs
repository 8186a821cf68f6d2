//! Knowledge graph construction from a corpus.
//!
//! Pipeline:
//! 1. Optionally translate the corpus to English
//! 2. Ask the backend for graph mutation statements
//! 3. Sanitize each statement; rejected ones never reach the store
//! 4. Flush the store (construction always replaces the whole graph)
//! 5. Apply statements one at a time, in order, skipping failures
//!
//! A failed statement is logged and skipped so one bad literal does not
//! throw away the rest of the extraction. Losing the store connection
//! mid-build is not a statement failure and aborts the build.

use crate::config::RetrievalConfig;
use kgqa_core::error::{ExtractionError, KgError, Result, StoreError};
use kgqa_core::sanitize::{sanitize_statement, SanitizePolicy};
use kgqa_core::store::GraphStore;
use kgqa_llm::{DynLlmBackend, LlmBackend};
use kgqa_runtime::backend::DynGraphStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A generated statement that was not applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedStatement {
    /// Position in the generated sequence.
    pub index: usize,
    pub statement: String,
    pub reason: String,
}

/// Outcome of one graph build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    /// Statements as generated, before sanitization.
    pub generated: Vec<String>,
    /// Number of statements the store accepted.
    pub applied: usize,
    pub skipped: Vec<SkippedStatement>,
}

impl BuildReport {
    /// Whether every generated statement was applied.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Turns a corpus into a populated graph store.
pub struct KnowledgeGraphBuilder {
    backend: DynLlmBackend,
    store: DynGraphStore,
    sanitize: SanitizePolicy,
    translate: bool,
}

impl KnowledgeGraphBuilder {
    pub fn new(backend: DynLlmBackend, store: DynGraphStore) -> Self {
        Self {
            backend,
            store,
            sanitize: SanitizePolicy::default(),
            translate: false,
        }
    }

    /// Take sanitization and translation settings from a retrieval config.
    pub fn with_config(mut self, config: &RetrievalConfig) -> Self {
        self.sanitize = config.sanitize;
        self.translate = config.translate;
        self
    }

    pub fn with_sanitize(mut self, policy: SanitizePolicy) -> Self {
        self.sanitize = policy;
        self
    }

    pub fn with_translation(mut self, translate: bool) -> Self {
        self.translate = translate;
        self
    }

    /// Generate mutation statements for `corpus` without touching the store.
    pub async fn generate(&self, corpus: &str) -> Result<Vec<String>> {
        let content = if self.translate {
            let translated = self.backend.translate(corpus).await?;
            debug!(chars = translated.len(), "Corpus translated");
            translated
        } else {
            corpus.to_string()
        };

        let statements = self.backend.generate_graph_statements(&content).await?;
        info!(
            backend = self.backend.name(),
            count = statements.len(),
            "Graph statements generated"
        );
        Ok(statements)
    }

    /// Generate statements for `corpus` and rebuild the graph from them.
    pub async fn build(&self, corpus: &str) -> Result<BuildReport> {
        let statements = self.generate(corpus).await?;
        self.apply(statements).await
    }

    /// Replace the graph with the given statements.
    pub async fn apply(&self, statements: Vec<String>) -> Result<BuildReport> {
        let mut skipped = Vec::new();
        let mut ready = Vec::with_capacity(statements.len());

        for (index, raw) in statements.iter().enumerate() {
            match sanitize_statement(raw, self.sanitize) {
                Ok(clean) => {
                    if clean != raw.trim() {
                        debug!(index, before = %raw, after = %clean, "Statement rewritten");
                    }
                    ready.push((index, clean));
                }
                Err(e) => {
                    warn!(index, reason = %e, "Skipping statement");
                    skipped.push(SkippedStatement {
                        index,
                        statement: raw.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.store.flush().await?;

        let mut applied = 0;
        for (index, statement) in ready {
            match self.store.execute(&statement).await {
                Ok(()) => applied += 1,
                Err(e @ (StoreError::Connection(_) | StoreError::Disconnected)) => {
                    return Err(KgError::Store(e));
                }
                Err(e) => {
                    let rejected = ExtractionError::Rejected {
                        index,
                        reason: e.to_string(),
                    };
                    warn!(index, reason = %e, "Skipping statement");
                    skipped.push(SkippedStatement {
                        index,
                        statement,
                        reason: rejected.to_string(),
                    });
                }
            }
        }
        skipped.sort_by_key(|s| s.index);

        info!(
            store = self.store.name(),
            applied,
            skipped = skipped.len(),
            "Graph built"
        );

        Ok(BuildReport {
            generated: statements,
            applied,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgqa_llm::{GraphExtractionPrompt, MockBackend, TranslatePrompt};
    use kgqa_runtime::memory::MemoryGraphStore;
    use std::sync::Arc;

    fn statements_json(statements: &[&str]) -> String {
        serde_json::json!({ "queries": statements }).to_string()
    }

    #[tokio::test]
    async fn builds_and_skips_bad_statements() {
        let response = statements_json(&[
            "CREATE (:Team {name: 'Denver Broncos'})",
            "CREATE (:Team {name: 'Carolina Panthers'",
            "DROP EVERYTHING",
        ]);
        let backend = Arc::new(
            MockBackend::new().with_response(GraphExtractionPrompt::TASK, &response),
        );
        let store = Arc::new(MemoryGraphStore::new());
        let builder = KnowledgeGraphBuilder::new(backend, store.clone());

        let report = builder.build("Denver Broncos defeated Carolina Panthers").await.unwrap();

        assert_eq!(report.generated.len(), 3);
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.skipped[1].index, 2);
        assert!(!report.is_complete());
        assert_eq!(store.node_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn where_style_edges_are_applied() {
        let response = statements_json(&[
            "MERGE (:Team {name: 'Denver Broncos'})",
            "MERGE (:Team {name: 'Carolina Panthers'})",
            "MATCH (a:Team), (b:Team) WHERE a.name = 'Denver Broncos' AND b.name = 'Carolina Panthers' \
             CREATE (a)-[:DEFEATED]->(b)",
            "MERGE (g:Game {name: 'Super Bowl 50'}) ON CREATE SET g.year = 2016",
        ]);
        let backend = Arc::new(
            MockBackend::new().with_response(GraphExtractionPrompt::TASK, &response),
        );
        let store = Arc::new(MemoryGraphStore::new());
        let builder = KnowledgeGraphBuilder::new(backend, store.clone());

        let report = builder.build("Denver Broncos defeated Carolina Panthers").await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.applied, 4);
        assert_eq!(store.edge_count().unwrap(), 1);
        assert_eq!(store.list_neighbors("n0", 1).await.unwrap()[0].id, "n1");
    }

    #[tokio::test]
    async fn build_replaces_previous_graph() {
        let backend = Arc::new(MockBackend::new().with_response(
            GraphExtractionPrompt::TASK,
            &statements_json(&["CREATE (:City {name: 'Warsaw'})"]),
        ));
        let store = Arc::new(MemoryGraphStore::new());
        store.execute("CREATE (:Stale {name: 'old'})").await.unwrap();

        let builder = KnowledgeGraphBuilder::new(backend, store.clone());
        builder.build("Warsaw").await.unwrap();

        let nodes = store.list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].labels, vec!["City".to_string()]);
    }

    #[tokio::test]
    async fn translation_runs_first_when_enabled() {
        let backend = Arc::new(
            MockBackend::new()
                .with_response(TranslatePrompt::TASK, r#"{"translated_content": "Warsaw is the capital"}"#)
                .with_response(GraphExtractionPrompt::TASK, &statements_json(&[])),
        );
        let store = Arc::new(MemoryGraphStore::new());
        let builder =
            KnowledgeGraphBuilder::new(backend.clone(), store).with_translation(true);

        let report = builder.build("Warszawa jest stolicą").await.unwrap();

        assert!(report.generated.is_empty());
        let prompts = backend.prompts();
        assert!(prompts[0].contains(TranslatePrompt::TASK));
        assert!(prompts[1].contains("Warsaw is the capital"));
    }

    #[tokio::test]
    async fn escape_policy_keeps_possessive() {
        let backend = Arc::new(MockBackend::new().with_response(
            GraphExtractionPrompt::TASK,
            &statements_json(&["CREATE (:Venue {name: 'Levi's Stadium'})"]),
        ));
        let store = Arc::new(MemoryGraphStore::new());
        let builder = KnowledgeGraphBuilder::new(backend, store.clone())
            .with_sanitize(SanitizePolicy::Escape);

        let report = builder.build("Levi's Stadium").await.unwrap();

        assert_eq!(report.applied, 1);
        let nodes = store.list_nodes().await.unwrap();
        assert_eq!(nodes[0].display_name(), "Levi's Stadium");
    }

    #[tokio::test]
    async fn backend_failure_aborts_before_flush() {
        let backend = Arc::new(
            MockBackend::new().with_response(GraphExtractionPrompt::TASK, "no json here"),
        );
        let store = Arc::new(MemoryGraphStore::new());
        store.execute("CREATE (:Kept {name: 'x'})").await.unwrap();

        let builder = KnowledgeGraphBuilder::new(backend, store.clone());
        let err = builder.build("text").await.unwrap_err();

        assert!(matches!(err, KgError::Backend(_)));
        assert_eq!(store.node_count().await.unwrap(), 1);
    }
}
