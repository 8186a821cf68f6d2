//! # kgqa LLM
//!
//! Generative backends for graph-grounded question answering.
//!
//! Every backend implements [`LlmBackend::complete`]; the five
//! schema-constrained operations the pipeline needs (translation, graph
//! extraction, anchor detection, question answering, answer validation) are
//! provided on top of it by structured generation.
//!
//! ## Features
//!
//! - `api`: Cloud API backends (Claude, OpenAI)
//! - `local`: Local backends (Ollama)
//! - `full`: All backends
//!
//! ## Usage
//!
//! ```rust
//! use kgqa_llm::prelude::*;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let backend = MockBackend::new()
//!     .with_response(QuestionAnswerPrompt::TASK, r#"{"success": true, "answer": "Denver Broncos"}"#);
//! let out = backend.answer_question("Who won Super Bowl 50?", &[]).await.unwrap();
//! assert_eq!(out.answer.as_deref(), Some("Denver Broncos"));
//! # });
//! ```

mod backend;
mod factory;
mod prompt;
pub mod structured;
mod types;

pub use backend::{LlmBackend, LlmConfig, LlmError, LlmResult, MockBackend};
pub use factory::{create_backend, BackendKind, DynLlmBackend};
pub use prompt::{
    AnchorDetectionPrompt, AnswerValidationPrompt, GraphExtractionPrompt, PromptTemplate,
    QuestionAnswerPrompt, TranslatePrompt,
};
pub use types::{
    NodeDetection, OutputSchema, QaOutput, SchemaField, StatementList, StructuredOutput,
    TranslateOutput, ValidationOutput,
};

#[cfg(any(feature = "api", feature = "local"))]
mod http;

#[cfg(feature = "local")]
mod ollama;
#[cfg(feature = "local")]
pub use ollama::OllamaBackend;

#[cfg(feature = "api")]
mod claude;
#[cfg(feature = "api")]
pub use claude::ClaudeBackend;

#[cfg(feature = "api")]
mod openai;
#[cfg(feature = "api")]
pub use openai::OpenAiBackend;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{create_backend, BackendKind, DynLlmBackend};
    pub use crate::{LlmBackend, LlmConfig, LlmError, LlmResult, MockBackend};
    pub use crate::{PromptTemplate, QaOutput, QuestionAnswerPrompt, StructuredOutput};

    #[cfg(feature = "local")]
    pub use crate::OllamaBackend;

    #[cfg(feature = "api")]
    pub use crate::{ClaudeBackend, OpenAiBackend};
}
