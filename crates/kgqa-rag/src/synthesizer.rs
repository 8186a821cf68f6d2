//! Answer synthesis from a neighborhood snapshot.

use kgqa_core::error::{KgError, Result};
use kgqa_core::types::NodeRecord;
use kgqa_llm::{DynLlmBackend, LlmBackend, QaOutput};
use tracing::warn;

/// Asks the backend to answer from the supplied nodes only.
///
/// Output that does not parse counts as "not enough context" so the
/// expander keeps widening instead of failing the question. Transport
/// failures that survive the backend's own retries are returned as errors.
pub struct AnswerSynthesizer {
    backend: DynLlmBackend,
}

impl AnswerSynthesizer {
    pub fn new(backend: DynLlmBackend) -> Self {
        Self { backend }
    }

    pub async fn answer(&self, question: &str, neighborhood: &[NodeRecord]) -> Result<QaOutput> {
        let output = match self.backend.answer_question(question, neighborhood).await {
            Ok(output) => output,
            Err(e) if e.is_schema_mismatch() => {
                warn!(error = %e, "Unparseable answer, treating as insufficient context");
                return Ok(QaOutput::insufficient());
            }
            Err(e) => return Err(KgError::from(e)),
        };

        // A "success" without an answer gives the caller nothing to report.
        let answered = output
            .answer
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty());
        if output.success && !answered {
            return Ok(QaOutput::insufficient());
        }

        Ok(QaOutput {
            success: output.success,
            answer: output.answer.map(|a| a.trim().to_string()),
        })
    }
}
