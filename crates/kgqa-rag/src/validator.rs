//! Answer validation against reference answers.
//!
//! Equivalence is judged by the backend, not by string comparison, because
//! reference answers are short spans the model is free to paraphrase. The
//! verdict is itself a model output and can be wrong; evaluation numbers
//! carry that noise.

use kgqa_core::error::Result;
use kgqa_llm::{DynLlmBackend, LlmBackend};
use tracing::debug;

pub struct AnswerValidator {
    backend: DynLlmBackend,
}

impl AnswerValidator {
    pub fn new(backend: DynLlmBackend) -> Self {
        Self { backend }
    }

    /// Whether `model_answer` means the same as any of `expected`.
    ///
    /// An empty answer or an empty reference list is never correct and costs
    /// no backend call.
    pub async fn validate(&self, model_answer: &str, expected: &[String]) -> Result<bool> {
        if model_answer.trim().is_empty() || expected.is_empty() {
            return Ok(false);
        }
        let verdict = self.backend.validate_answer(model_answer, expected).await?;
        debug!(answer = %model_answer, verdict, "Answer validated");
        Ok(verdict)
    }
}
