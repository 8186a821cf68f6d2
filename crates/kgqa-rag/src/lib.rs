//! # kgqa RAG
//!
//! Graph-grounded retrieval for question answering.
//!
//! A generative backend extracts a property graph from a corpus. Each
//! question is then pinned to one anchor node, and the context handed back
//! to the backend grows one hop at a time until it can answer or the graph
//! stops yielding new nodes.
//!
//! ## How it differs from chunk retrieval
//!
//! | Chunk RAG | kgqa |
//! |-----------|------|
//! | Chunk → embed → vector search | Extract → graph → anchor |
//! | Fixed top-k context | Context widens per hop until sufficient |
//! | Stops after one lookup | Stops on answer, stall or radius ceiling |

pub mod anchor;
pub mod builder;
pub mod config;
pub mod evaluation;
pub mod expander;
pub mod pipeline;
pub mod prelude;
pub mod synthesizer;
pub mod validator;

pub use anchor::AnchorResolver;
pub use builder::{BuildReport, KnowledgeGraphBuilder, SkippedStatement};
pub use config::RetrievalConfig;
pub use evaluation::{EvaluationReport, QuestionReport};
pub use expander::ContextExpander;
pub use pipeline::QaPipeline;
pub use synthesizer::AnswerSynthesizer;
pub use validator::AnswerValidator;
