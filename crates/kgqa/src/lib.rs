//! # kgqa
//!
//! Knowledge-graph construction and graph-grounded question answering.
//!
//! A generative model reads a corpus and writes a property graph. Questions
//! are answered by picking the node the question is about and feeding the
//! model a widening ring of neighbors until it can answer, or until widening
//! stops finding anything new.
//!
//! ## Quick Start
//!
//! ```rust
//! use kgqa::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let backend = Arc::new(
//!     MockBackend::new()
//!         .with_response(
//!             "graph-extraction",
//!             r#"{"queries": ["MERGE (b:Team {name: 'Denver Broncos'}) MERGE (p:Team {name: 'Carolina Panthers'}) MERGE (b)-[:DEFEATED]->(p)"]}"#,
//!         )
//!         .with_response("anchor-detection", r#"{"node_id": "n1"}"#)
//!         .with_response("question-answering", r#"{"success": true, "answer": "Denver Broncos"}"#),
//! );
//! let store = Arc::new(MemoryGraphStore::new());
//! let pipeline = QaPipeline::new(backend, store, RetrievalConfig::default())?;
//!
//! pipeline.build("Denver Broncos defeated Carolina Panthers").await?;
//! let attempt = pipeline.ask("Who defeated the Panthers?").await?;
//!
//! assert_eq!(attempt.outcome, ExpansionOutcome::Converged);
//! assert_eq!(attempt.answer.as_deref(), Some("Denver Broncos"));
//! # Ok::<(), KgError>(())
//! # }).unwrap();
//! ```
//!
//! ## Architecture
//!
//! - [`kgqa_core`] - Data model, error taxonomy, the `GraphStore` contract, statement grammar
//! - [`kgqa_llm`] - Generative backends and structured generation
//! - [`kgqa_runtime`] - Graph stores (memory, SQLite, Neo4j) and corpus loading
//! - [`kgqa_rag`] - Builder, anchor resolver, context expander, validator, evaluation
//!
//! ## Expansion
//!
//! | Outcome | When |
//! |---------|------|
//! | Converged | The model answered from the current ring |
//! | Stalled | Two consecutive radii returned the same node set |
//! | RadiusExhausted | The optional `max_radius` was passed |

// Re-export all subcrates
pub use kgqa_core as core;
pub use kgqa_llm as llm;
pub use kgqa_rag as rag;
pub use kgqa_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use kgqa::prelude::*;
/// ```
pub mod prelude {
    pub use kgqa_rag::prelude::*;
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
