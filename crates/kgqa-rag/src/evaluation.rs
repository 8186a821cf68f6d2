//! Batch evaluation over a question set.
//!
//! Questions are independent, so up to `concurrency` of them run at once
//! against the shared, already-built graph. Each question gets its own
//! resolve → expand → validate chain; a failure in one is recorded on its
//! report and never aborts the batch.

use crate::pipeline::QaPipeline;
use futures::stream::{self, StreamExt};
use kgqa_core::types::{ExpansionOutcome, QuestionRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// What happened to one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReport {
    pub question: String,
    pub expected: Vec<String>,
    pub answer: Option<String>,
    /// The expander produced an answer.
    pub success: bool,
    /// The validator judged the answer correct.
    pub verdict: bool,
    pub anchor_id: Option<String>,
    pub radius: usize,
    pub iterations: usize,
    pub outcome: Option<ExpansionOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuestionReport {
    fn failed(record: &QuestionRecord, error: String) -> Self {
        Self {
            question: record.question.clone(),
            expected: record.expected_answers.clone(),
            answer: None,
            success: false,
            verdict: false,
            anchor_id: None,
            radius: 0,
            iterations: 0,
            outcome: None,
            error: Some(error),
        }
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub corpus: String,
    pub total: usize,
    /// Questions the expander answered.
    pub answered: usize,
    /// Questions the validator accepted.
    pub correct: usize,
    /// Questions that ended in an error.
    pub errors: usize,
    /// `correct / total`, 0 when there are no questions.
    pub accuracy: f64,
    pub questions: Vec<QuestionReport>,
}

impl EvaluationReport {
    /// Aggregate per-question reports.
    pub fn from_questions(corpus: impl Into<String>, questions: Vec<QuestionReport>) -> Self {
        let total = questions.len();
        let answered = questions.iter().filter(|q| q.success).count();
        let correct = questions.iter().filter(|q| q.verdict).count();
        let errors = questions.iter().filter(|q| q.error.is_some()).count();
        let accuracy = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        };

        Self {
            run_id: Uuid::new_v4(),
            corpus: corpus.into(),
            total,
            answered,
            correct,
            errors,
            accuracy,
            questions,
        }
    }
}

impl QaPipeline {
    /// Run one question end to end, folding any error into the report.
    pub async fn evaluate_question(&self, record: &QuestionRecord) -> QuestionReport {
        let attempt = match self.ask(&record.question).await {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!(question = %record.question, error = %e, "Question failed");
                return QuestionReport::failed(record, e.to_string());
            }
        };

        let (verdict, error) = match self.validate(&attempt, &record.expected_answers).await {
            Ok(verdict) => (verdict, None),
            Err(e) => {
                warn!(question = %record.question, error = %e, "Validation failed");
                (false, Some(e.to_string()))
            }
        };

        QuestionReport {
            question: record.question.clone(),
            expected: record.expected_answers.clone(),
            answer: attempt.answer,
            success: attempt.success,
            verdict,
            anchor_id: Some(attempt.anchor_id),
            radius: attempt.radius,
            iterations: attempt.iterations,
            outcome: Some(attempt.outcome),
            error,
        }
    }

    /// Evaluate every question, `on_done` firing as each one finishes.
    ///
    /// Reports come back in question order regardless of completion order.
    pub async fn evaluate<F>(
        &self,
        corpus: &str,
        questions: &[QuestionRecord],
        on_done: F,
    ) -> EvaluationReport
    where
        F: Fn(&QuestionReport),
    {
        let concurrency = self.config().concurrency.max(1);
        let reports: Vec<QuestionReport> = stream::iter(questions)
            .map(|record| self.evaluate_question(record))
            .buffered(concurrency)
            .inspect(|report| on_done(report))
            .collect()
            .await;

        let report = EvaluationReport::from_questions(corpus, reports);
        info!(
            run_id = %report.run_id,
            corpus = %report.corpus,
            total = report.total,
            answered = report.answered,
            correct = report.correct,
            accuracy = report.accuracy,
            "Evaluation finished"
        );
        report
    }
}
