//! Adaptive context expansion around an anchor node.
//!
//! The loop asks for the layer of nodes at `radius` hops from the anchor and
//! hands it to the synthesizer. When the synthesizer reports insufficient
//! context the radius grows by one and the store is queried again; each
//! radius is fetched on its own and never derived from the previous one.
//!
//! Termination:
//! - `Converged`: the synthesizer answered
//! - `Stalled`: a radius returned the same node set as the one before it
//! - `RadiusExhausted`: the optional `max_radius` ceiling was passed
//!
//! Store errors end the attempt as errors; they are never reported as a stall.

use crate::config::RetrievalConfig;
use crate::synthesizer::AnswerSynthesizer;
use kgqa_core::error::Result;
use kgqa_core::store::GraphStore;
use kgqa_core::types::{AnswerAttempt, ExpansionOutcome, Neighborhood};
use kgqa_runtime::backend::DynGraphStore;
use tracing::{debug, info};

pub struct ContextExpander {
    store: DynGraphStore,
    synthesizer: AnswerSynthesizer,
    start_radius: usize,
    max_radius: Option<usize>,
}

impl ContextExpander {
    pub fn new(store: DynGraphStore, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            store,
            synthesizer,
            start_radius: 1,
            max_radius: None,
        }
    }

    /// Take radius bounds from a retrieval config.
    pub fn with_config(mut self, config: &RetrievalConfig) -> Self {
        self.start_radius = config.start_radius;
        self.max_radius = config.max_radius;
        self
    }

    pub fn with_max_radius(mut self, max_radius: Option<usize>) -> Self {
        self.max_radius = max_radius;
        self
    }

    /// Expand around `anchor_id` until the question is answered or the search stops growing.
    pub async fn expand(&self, question: &str, anchor_id: &str) -> Result<AnswerAttempt> {
        let mut radius = self.start_radius;
        let mut iterations = 0;
        let mut previous: Option<Neighborhood> = None;

        loop {
            if self.max_radius.is_some_and(|max| radius > max) {
                info!(anchor = %anchor_id, radius = radius - 1, iterations, "Radius ceiling reached");
                let last = previous
                    .unwrap_or_else(|| Neighborhood::new(anchor_id, radius - 1, Vec::new()));
                return Ok(finish(
                    question,
                    last,
                    iterations,
                    None,
                    ExpansionOutcome::RadiusExhausted,
                ));
            }

            let nodes = self.store.list_neighbors(anchor_id, radius).await?;
            iterations += 1;
            let neighborhood = Neighborhood::new(anchor_id, radius, nodes);
            debug!(radius, size = neighborhood.len(), "Expansion step");

            if previous
                .as_ref()
                .is_some_and(|p| p.same_nodes_as(&neighborhood))
            {
                info!(anchor = %anchor_id, radius, iterations, "Expansion stalled");
                return Ok(finish(
                    question,
                    neighborhood,
                    iterations,
                    None,
                    ExpansionOutcome::Stalled,
                ));
            }

            let output = self.synthesizer.answer(question, &neighborhood.nodes).await?;
            if output.success {
                info!(anchor = %anchor_id, radius, iterations, "Expansion converged");
                return Ok(finish(
                    question,
                    neighborhood,
                    iterations,
                    output.answer,
                    ExpansionOutcome::Converged,
                ));
            }

            previous = Some(neighborhood);
            radius += 1;
        }
    }
}

fn finish(
    question: &str,
    neighborhood: Neighborhood,
    iterations: usize,
    answer: Option<String>,
    outcome: ExpansionOutcome,
) -> AnswerAttempt {
    AnswerAttempt {
        question: question.to_string(),
        anchor_id: neighborhood.anchor_id,
        radius: neighborhood.radius,
        iterations,
        neighborhood: neighborhood.nodes,
        success: outcome.is_success(),
        answer,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgqa_core::error::{KgError, StoreError};
    use kgqa_llm::{MockBackend, QuestionAnswerPrompt};
    use kgqa_runtime::memory::MemoryGraphStore;
    use std::sync::Arc;

    const NOT_ENOUGH: &str = r#"{"success": false}"#;

    async fn chain(len: usize) -> Arc<MemoryGraphStore> {
        let store = Arc::new(MemoryGraphStore::new());
        store.execute("CREATE (:Step {i: 0})").await.unwrap();
        for i in 1..len {
            store
                .execute(&format!(
                    "MATCH (a:Step {{i: {}}}) CREATE (a)-[:NEXT]->(:Step {{i: {}}})",
                    i - 1,
                    i
                ))
                .await
                .unwrap();
        }
        store
    }

    fn expander(store: Arc<MemoryGraphStore>, backend: Arc<MockBackend>) -> ContextExpander {
        ContextExpander::new(store, AnswerSynthesizer::new(backend))
    }

    #[tokio::test]
    async fn converges_at_first_radius() {
        let backend = Arc::new(MockBackend::new().with_response(
            QuestionAnswerPrompt::TASK,
            r#"{"success": true, "answer": "step one"}"#,
        ));
        let attempt = expander(chain(3).await, backend.clone())
            .expand("What follows?", "n0")
            .await
            .unwrap();

        assert_eq!(attempt.outcome, ExpansionOutcome::Converged);
        assert!(attempt.success);
        assert_eq!(attempt.radius, 1);
        assert_eq!(attempt.iterations, 1);
        assert_eq!(attempt.neighborhood.len(), 1);
        assert_eq!(attempt.answer.as_deref(), Some("step one"));
    }

    #[tokio::test]
    async fn stalls_past_end_of_chain() {
        let backend =
            Arc::new(MockBackend::new().with_response(QuestionAnswerPrompt::TASK, NOT_ENOUGH));
        let attempt = expander(chain(3).await, backend.clone())
            .expand("What follows?", "n0")
            .await
            .unwrap();

        // Radii 1 and 2 each hold one node, radius 3 is empty and radius 4 repeats it.
        assert_eq!(attempt.outcome, ExpansionOutcome::Stalled);
        assert!(!attempt.success);
        assert_eq!(attempt.iterations, 4);
        assert_eq!(attempt.radius, 4);
        assert!(attempt.answer.is_none());
        assert_eq!(backend.calls_matching(QuestionAnswerPrompt::TASK), 3);
    }

    #[tokio::test]
    async fn radius_ceiling_stops_expansion() {
        let backend =
            Arc::new(MockBackend::new().with_response(QuestionAnswerPrompt::TASK, NOT_ENOUGH));
        let attempt = expander(chain(10).await, backend)
            .with_max_radius(Some(2))
            .expand("What follows?", "n0")
            .await
            .unwrap();

        assert_eq!(attempt.outcome, ExpansionOutcome::RadiusExhausted);
        assert!(!attempt.success);
        assert_eq!(attempt.iterations, 2);
        assert_eq!(attempt.radius, 2);
    }

    #[tokio::test]
    async fn start_radius_is_honoured() {
        let backend = Arc::new(MockBackend::new().with_response(
            QuestionAnswerPrompt::TASK,
            r#"{"success": true, "answer": "far"}"#,
        ));
        let config = RetrievalConfig::default().with_start_radius(3);
        let attempt = expander(chain(5).await, backend)
            .with_config(&config)
            .expand("What is far?", "n0")
            .await
            .unwrap();

        assert_eq!(attempt.radius, 3);
        assert_eq!(attempt.neighborhood[0].id, "n3");
    }

    #[tokio::test]
    async fn unknown_anchor_is_a_store_error() {
        let backend = Arc::new(MockBackend::new());
        let err = expander(chain(2).await, backend.clone())
            .expand("Who?", "n99")
            .await
            .unwrap_err();

        assert!(matches!(err, KgError::Store(StoreError::NodeNotFound(_))));
        assert_eq!(backend.call_count(), 0);
    }
}
