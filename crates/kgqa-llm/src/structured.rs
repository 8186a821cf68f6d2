//! Structured generation: (prompt, schema) → parsed value or schema error.
//!
//! The schema's format instructions are appended to the prompt, the raw
//! completion is reduced to its JSON object and deserialized. Transport
//! failures are retried per [`LlmConfig`](crate::LlmConfig); schema failures
//! are returned to the caller untouched.

use crate::backend::{LlmBackend, LlmError, LlmResult};
use crate::prompt::PromptTemplate;
use crate::types::StructuredOutput;
use std::time::Duration;
use tracing::{debug, warn};

/// Run one schema-constrained request against `backend`.
pub async fn generate<B, P, T>(backend: &B, prompt: &P) -> LlmResult<T>
where
    B: LlmBackend + ?Sized,
    P: PromptTemplate + Sync + ?Sized,
    T: StructuredOutput,
{
    let schema = T::schema();
    let text = format!("{}\n\n{}", prompt.generate(), schema.format_instructions());
    let system = prompt.system_prompt();
    let config = backend.config();

    let mut attempt = 0;
    let raw = loop {
        match backend.complete(&text, system.as_deref()).await {
            Ok(raw) => break raw,
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    backend = backend.name(),
                    task = prompt.task(),
                    attempt,
                    error = %e,
                    "Transient backend failure, retrying"
                );
                tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
            }
            Err(e) => return Err(e),
        }
    };

    debug!(
        backend = backend.name(),
        task = prompt.task(),
        bytes = raw.len(),
        "Structured completion received"
    );
    parse_output(&raw, schema.title)
}

/// Parse a raw completion against `T`.
pub fn parse_output<T: StructuredOutput>(raw: &str, schema: &str) -> LlmResult<T> {
    serde_json::from_str(extract_json_object(raw)).map_err(|e| LlmError::SchemaMismatch {
        schema: schema.to_string(),
        reason: format!("{}. Response: {}", e, preview(raw)),
    })
}

/// Cut a JSON object out of a completion that may carry fences or prose.
pub fn extract_json_object(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    let text = text.trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn preview(raw: &str) -> String {
    const MAX: usize = 200;
    match raw.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::prompt::{QuestionAnswerPrompt, TranslatePrompt};
    use crate::types::{QaOutput, StatementList, TranslateOutput};

    #[test]
    fn test_extract_fenced_object() {
        let raw = "```json\n{\"queries\": [\"MERGE (a:Team {name: 'Broncos'})\"]}\n```";
        let parsed: StatementList = parse_output(raw, "StatementList").unwrap();
        assert_eq!(parsed.queries.len(), 1);
    }

    #[test]
    fn test_extract_object_from_prose() {
        let raw = "Sure! Here is the result: {\"success\": true, \"answer\": \"Denver\"} Hope it helps.";
        assert_eq!(
            extract_json_object(raw),
            "{\"success\": true, \"answer\": \"Denver\"}"
        );
    }

    #[test]
    fn test_schema_mismatch() {
        let err = parse_output::<QaOutput>("{\"answer\": \"x\"}", "QaOutput").unwrap_err();
        assert!(err.is_schema_mismatch());
        assert!(err.to_string().contains("QaOutput"));
    }

    #[tokio::test]
    async fn test_prompt_carries_format_instructions() {
        let backend = MockBackend::new().with_response(
            TranslatePrompt::TASK,
            r#"{"translated_content": "hello"}"#,
        );
        let out: TranslateOutput = generate(&backend, &TranslatePrompt::new("hola"))
            .await
            .unwrap();
        assert_eq!(out.translated_content, "hello");
        assert!(backend.prompts()[0].contains("\"translated_content\""));
    }

    #[tokio::test]
    async fn test_retries_transient_failure_once() {
        let backend = MockBackend::new()
            .with_transient_failures(1)
            .with_response(QuestionAnswerPrompt::TASK, r#"{"success": false}"#);

        let out: QaOutput = generate(&backend, &QuestionAnswerPrompt::new("q", &[]))
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let backend = MockBackend::new().with_transient_failures(5);

        let err = generate::<_, _, QaOutput>(&backend, &QuestionAnswerPrompt::new("q", &[]))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_schema_failure_is_not_retried() {
        let backend = MockBackend::new().with_response(QuestionAnswerPrompt::TASK, "no idea");

        let err = generate::<_, _, QaOutput>(&backend, &QuestionAnswerPrompt::new("q", &[]))
            .await
            .unwrap_err();
        assert!(err.is_schema_mismatch());
        assert_eq!(backend.call_count(), 1);
    }
}
