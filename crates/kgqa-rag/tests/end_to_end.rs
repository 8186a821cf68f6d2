//! End-to-end tests for graph construction and question answering.
//!
//! Run with: cargo test -p kgqa-rag --test end_to_end
//!
//! Everything runs against the in-process store and a scripted backend:
//! 1. Build: flush-then-rebuild idempotence, statement sanitization
//! 2. Expansion: per-radius queries, stall detection
//! 3. The three question-answering scenarios over a small football graph

use async_trait::async_trait;
use kgqa_llm::{AnchorDetectionPrompt, AnswerValidationPrompt, GraphExtractionPrompt};
use kgqa_rag::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const BRONCOS_DEFEATED_PANTHERS: &str = "MERGE (b:Team {name: 'Denver Broncos'}) \
     MERGE (p:Team {name: 'Carolina Panthers'}) \
     MERGE (b)-[:DEFEATED]->(p)";

const NOT_ENOUGH: &str = r#"{"success": false}"#;

fn statements_json(statements: &[&str]) -> String {
    serde_json::json!({ "queries": statements }).to_string()
}

fn anchor_json(id: &str) -> String {
    serde_json::json!({ "node_id": id }).to_string()
}

fn pipeline(backend: Arc<MockBackend>, store: Arc<dyn GraphStore>) -> QaPipeline {
    QaPipeline::new(backend, store, RetrievalConfig::default()).unwrap()
}

fn node(id: &str) -> NodeRecord {
    NodeRecord::new(id, vec!["Thing".into()], Properties::new())
}

/// A store whose neighbor layers are scripted per radius, recording every call.
struct ScriptedStore {
    inventory: Vec<NodeRecord>,
    layers: HashMap<usize, Vec<NodeRecord>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedStore {
    fn new(layers: &[(usize, &[&str])]) -> Self {
        let layers: HashMap<usize, Vec<NodeRecord>> = layers
            .iter()
            .map(|(r, ids)| (*r, ids.iter().map(|id| node(id)).collect()))
            .collect();
        Self {
            inventory: vec![node("anchor")],
            layers,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, _statement: &str) -> StoreResult<()> {
        Err(StoreError::Execution("read-only".into()))
    }

    async fn list_nodes(&self) -> StoreResult<Vec<NodeRecord>> {
        Ok(self.inventory.clone())
    }

    async fn list_edges(&self) -> StoreResult<Vec<EdgeRecord>> {
        Ok(Vec::new())
    }

    async fn list_neighbors(&self, anchor_id: &str, radius: usize) -> StoreResult<Vec<NodeRecord>> {
        self.calls
            .lock()
            .unwrap()
            .push((anchor_id.to_string(), radius));
        Ok(self.layers.get(&radius).cloned().unwrap_or_default())
    }

    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn disconnect(&self) -> StoreResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rebuild_yields_same_graph() {
    let backend = Arc::new(MockBackend::new().with_response(
        GraphExtractionPrompt::TASK,
        &statements_json(&[
            BRONCOS_DEFEATED_PANTHERS,
            "MATCH (b:Team {name: 'Denver Broncos'}) \
             MERGE (b)-[:PLAYED_AT]->(:Venue {name: 'Levis Stadium'})",
        ]),
    ));
    let store = Arc::new(MemoryGraphStore::new());
    let pipeline = pipeline(backend.clone(), store.clone());
    let corpus = "Denver Broncos defeated Carolina Panthers at Levis Stadium";

    let first = pipeline.build(corpus).await.unwrap();
    let nodes_after_first = store.list_nodes().await.unwrap();
    let edges_after_first = store.list_edges().await.unwrap();

    let second = pipeline.build(corpus).await.unwrap();
    let nodes_after_second = store.list_nodes().await.unwrap();
    let edges_after_second = store.list_edges().await.unwrap();

    assert_eq!(first.applied, 2);
    assert_eq!(second.applied, 2);
    assert_eq!(nodes_after_first.len(), 3);
    assert_eq!(edges_after_first.len(), 2);
    assert_eq!(nodes_after_first, nodes_after_second);
    assert_eq!(edges_after_first, edges_after_second);
    assert_eq!(backend.calls_matching(GraphExtractionPrompt::TASK), 2);
}

#[tokio::test]
async fn apostrophes_never_break_adjacent_statements() {
    let backend = Arc::new(MockBackend::new().with_response(
        GraphExtractionPrompt::TASK,
        &statements_json(&[
            "CREATE (:Team {name: 'Denver Broncos'})",
            "CREATE (:Venue {name: 'Levi's Stadium'})",
            "CREATE (:Team {name: 'Panthers' stadium'})",
            "CREATE (:City {name: 'Santa Clara'})",
        ]),
    ));
    let store = Arc::new(MemoryGraphStore::new());
    let report = pipeline(backend, store.clone())
        .build("Super Bowl 50")
        .await
        .unwrap();

    // The inner apostrophe is neutralized, the trailing possessive is rejected.
    assert_eq!(report.applied, 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 2);

    let names: Vec<String> = store
        .list_nodes()
        .await
        .unwrap()
        .iter()
        .map(NodeRecord::display_name)
        .collect();
    assert_eq!(names, vec!["Denver Broncos", "Levis Stadium", "Santa Clara"]);
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_radius_is_queried_independently() {
    // Layers overlap without being equal, so none of them stalls.
    let store = Arc::new(ScriptedStore::new(&[
        (1, &["x", "y"]),
        (2, &["y", "z"]),
        (3, &["z", "w"]),
    ]));
    let backend = Arc::new(
        MockBackend::new()
            .with_response(AnchorDetectionPrompt::TASK, &anchor_json("anchor"))
            .with_responses(
                QuestionAnswerPrompt::TASK,
                [NOT_ENOUGH, NOT_ENOUGH, r#"{"success": true, "answer": "w"}"#],
            ),
    );

    let attempt = pipeline(backend, store.clone())
        .ask("Where does it end?")
        .await
        .unwrap();

    assert_eq!(attempt.outcome, ExpansionOutcome::Converged);
    assert_eq!(attempt.iterations, 3);
    assert_eq!(
        store.calls(),
        vec![
            ("anchor".to_string(), 1),
            ("anchor".to_string(), 2),
            ("anchor".to_string(), 3),
        ]
    );
}

#[tokio::test]
async fn repeated_layer_stalls_after_one_extra_iteration() {
    let store = Arc::new(ScriptedStore::new(&[
        (1, &["x"]),
        (2, &["y", "z"]),
        (3, &["z", "y"]),
        (4, &["q"]),
    ]));
    let backend = Arc::new(
        MockBackend::new()
            .with_response(AnchorDetectionPrompt::TASK, &anchor_json("anchor"))
            .with_response(QuestionAnswerPrompt::TASK, NOT_ENOUGH),
    );

    let attempt = pipeline(backend.clone(), store.clone())
        .ask("What is next?")
        .await
        .unwrap();

    assert_eq!(attempt.outcome, ExpansionOutcome::Stalled);
    assert!(!attempt.success);
    assert_eq!(attempt.iterations, 3);
    assert_eq!(attempt.radius, 3);
    assert_eq!(store.calls().len(), 3);
    // The repeated layer is not sent to the synthesizer.
    assert_eq!(backend.calls_matching(QuestionAnswerPrompt::TASK), 2);
}

#[tokio::test]
async fn store_failure_is_not_a_stall() {
    let store = Arc::new(MemoryGraphStore::new());
    store.execute("CREATE (:Team {name: 'Broncos'})").await.unwrap();
    let backend = Arc::new(
        MockBackend::new().with_response(AnchorDetectionPrompt::TASK, &anchor_json("n0")),
    );
    let pipeline = pipeline(backend, store.clone());

    store.disconnect().await.unwrap();
    let err = pipeline.ask("Who?").await.unwrap_err();
    assert!(matches!(err, KgError::Store(StoreError::Disconnected)));
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_direct_neighbor_answers() {
    let backend = Arc::new(
        MockBackend::new()
            .with_response(
                GraphExtractionPrompt::TASK,
                &statements_json(&[BRONCOS_DEFEATED_PANTHERS]),
            )
            .with_response(AnchorDetectionPrompt::TASK, &anchor_json("n1"))
            .with_response(
                QuestionAnswerPrompt::TASK,
                r#"{"success": true, "answer": "Denver Broncos"}"#,
            )
            .with_response(AnswerValidationPrompt::TASK, r#"{"result": true}"#),
    );
    let store = Arc::new(MemoryGraphStore::new());
    let pipeline = pipeline(backend.clone(), store.clone());

    pipeline
        .build("Denver Broncos defeated Carolina Panthers")
        .await
        .unwrap();
    let panthers = &store.list_nodes().await.unwrap()[1];
    assert_eq!(panthers.display_name(), "Carolina Panthers");

    let attempt = pipeline.ask("Who defeated the Panthers?").await.unwrap();
    assert_eq!(attempt.anchor_id, "n1");
    assert_eq!(attempt.radius, 1);
    assert_eq!(attempt.iterations, 1);
    assert_eq!(attempt.neighborhood.len(), 1);
    assert_eq!(attempt.neighborhood[0].display_name(), "Denver Broncos");
    assert_eq!(attempt.answer.as_deref(), Some("Denver Broncos"));

    let expected = vec!["Denver Broncos".to_string()];
    assert!(pipeline.validate(&attempt, &expected).await.unwrap());

    // The synthesizer saw the Broncos node as context.
    let qa_prompt = backend
        .prompts()
        .into_iter()
        .find(|p| p.contains(QuestionAnswerPrompt::TASK))
        .unwrap();
    assert!(qa_prompt.contains("Denver Broncos"));
}

#[tokio::test]
async fn scenario_isolated_anchor_stalls() {
    let backend = Arc::new(
        MockBackend::new()
            .with_response(
                GraphExtractionPrompt::TASK,
                &statements_json(&[
                    BRONCOS_DEFEATED_PANTHERS,
                    "CREATE (:Venue {name: 'Levis Stadium'})",
                ]),
            )
            .with_response(AnchorDetectionPrompt::TASK, &anchor_json("n2"))
            .with_response(QuestionAnswerPrompt::TASK, NOT_ENOUGH),
    );
    let store = Arc::new(MemoryGraphStore::new());
    let pipeline = pipeline(backend.clone(), store);

    pipeline.build("Levis Stadium").await.unwrap();
    let attempt = pipeline.ask("Who played at Levis Stadium?").await.unwrap();

    assert_eq!(attempt.outcome, ExpansionOutcome::Stalled);
    assert!(!attempt.success);
    assert!(attempt.answer.is_none());
    assert_eq!(attempt.iterations, 2);
    assert!(attempt.neighborhood.is_empty());
    assert!(!pipeline.validate(&attempt, &["Broncos".to_string()]).await.unwrap());
    assert_eq!(backend.calls_matching(AnswerValidationPrompt::TASK), 0);
}

#[tokio::test]
async fn scenario_second_radius_converges() {
    let backend = Arc::new(
        MockBackend::new()
            .with_response(
                GraphExtractionPrompt::TASK,
                &statements_json(&[
                    BRONCOS_DEFEATED_PANTHERS,
                    "MATCH (p:Team {name: 'Carolina Panthers'}) \
                     CREATE (p)-[:BASED_IN]->(:City {name: 'Charlotte'})",
                ]),
            )
            .with_response(AnchorDetectionPrompt::TASK, &anchor_json("n0"))
            .with_responses(
                QuestionAnswerPrompt::TASK,
                [NOT_ENOUGH, r#"{"success": true, "answer": "Charlotte"}"#],
            ),
    );
    let store = Arc::new(MemoryGraphStore::new());
    let pipeline = pipeline(backend.clone(), store);

    pipeline.build("Broncos beat the Charlotte team").await.unwrap();
    let attempt = pipeline
        .ask("Where is the team the Broncos defeated based?")
        .await
        .unwrap();

    assert_eq!(attempt.outcome, ExpansionOutcome::Converged);
    assert_eq!(attempt.iterations, 2);
    assert_eq!(attempt.radius, 2);
    assert_eq!(attempt.neighborhood[0].display_name(), "Charlotte");
    assert_eq!(attempt.answer.as_deref(), Some("Charlotte"));
    assert_eq!(backend.calls_matching(QuestionAnswerPrompt::TASK), 2);
}

#[tokio::test]
async fn batch_evaluation_reports_each_question() {
    let backend = Arc::new(
        MockBackend::new()
            .with_response(
                GraphExtractionPrompt::TASK,
                &statements_json(&[BRONCOS_DEFEATED_PANTHERS]),
            )
            .with_response(AnchorDetectionPrompt::TASK, &anchor_json("n1"))
            .with_response(
                QuestionAnswerPrompt::TASK,
                r#"{"success": true, "answer": "Denver Broncos"}"#,
            )
            .with_response(AnswerValidationPrompt::TASK, r#"{"result": true}"#),
    );
    let store = Arc::new(MemoryGraphStore::new());
    let pipeline = QaPipeline::new(
        backend,
        store,
        RetrievalConfig::default().with_concurrency(2),
    )
    .unwrap();
    pipeline.build("Denver Broncos defeated Carolina Panthers").await.unwrap();

    let questions = vec![
        QuestionRecord::new("Who defeated the Panthers?", vec!["Denver Broncos".into()]),
        QuestionRecord::new("Who lost?", vec![]),
        QuestionRecord::new("Which team won?", vec!["the Broncos".into()]),
    ];
    let finished = Mutex::new(0usize);
    let report = pipeline
        .evaluate("Super_Bowl_50", &questions, |_| {
            *finished.lock().unwrap() += 1;
        })
        .await;

    assert_eq!(*finished.lock().unwrap(), 3);
    assert_eq!(report.total, 3);
    assert_eq!(report.answered, 3);
    // No reference answers means no verdict.
    assert_eq!(report.correct, 2);
    assert_eq!(report.questions[1].question, "Who lost?");
    assert!(!report.questions[1].verdict);
    assert!((report.accuracy - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn batch_evaluation_records_errors() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryGraphStore::new());
    let pipeline = pipeline(backend, store);

    let questions = vec![QuestionRecord::new("Anyone?", vec!["x".into()])];
    let report = pipeline.evaluate("empty", &questions, |_| {}).await;

    assert_eq!(report.errors, 1);
    assert_eq!(report.accuracy, 0.0);
    let error = report.questions[0].error.as_deref().unwrap();
    assert!(error.contains("no nodes"));
}
