//! kgqa RAG Prelude: convenient imports for common usage.
//!
//! ```rust
//! use kgqa_rag::prelude::*;
//! ```

// Pipeline stages
pub use crate::anchor::AnchorResolver;
pub use crate::builder::{BuildReport, KnowledgeGraphBuilder, SkippedStatement};
pub use crate::expander::ContextExpander;
pub use crate::synthesizer::AnswerSynthesizer;
pub use crate::validator::AnswerValidator;

// Orchestration
pub use crate::config::RetrievalConfig;
pub use crate::evaluation::{EvaluationReport, QuestionReport};
pub use crate::pipeline::QaPipeline;

// Re-export from runtime
pub use kgqa_runtime::prelude::*;

// Re-export from llm
pub use kgqa_llm::prelude::*;
