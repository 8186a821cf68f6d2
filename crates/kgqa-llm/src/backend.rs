//! Core generative backend trait.

use crate::prompt::{
    AnchorDetectionPrompt, AnswerValidationPrompt, GraphExtractionPrompt, QuestionAnswerPrompt,
    TranslatePrompt,
};
use crate::structured;
use crate::types::{NodeDetection, QaOutput, StatementList, TranslateOutput, ValidationOutput};
use async_trait::async_trait;
use kgqa_core::error::KgError;
use kgqa_core::types::NodeRecord;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// LLM-related errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The completion did not match the requested output schema.
    #[error("Output does not match schema {schema}: {reason}")]
    SchemaMismatch { schema: String, reason: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Missing API key: set {0}")]
    MissingApiKey(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u32),

    #[error("Backend not available in this build: {0}")]
    Unsupported(String),
}

impl LlmError {
    /// Transport-level failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::ConnectionFailed(_) | LlmError::Timeout(_) | LlmError::RateLimited(_)
        )
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, LlmError::SchemaMismatch { .. })
    }
}

impl From<LlmError> for KgError {
    fn from(e: LlmError) -> Self {
        KgError::Backend(e.to_string())
    }
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Configuration for LLM requests.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u32,
    /// Extra attempts after a transient failure.
    pub max_retries: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Ask the provider for a JSON-only response where supported.
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
            timeout_secs: 60,
            max_retries: 1,
            retry_delay_ms: 500,
            json_mode: false,
        }
    }
}

impl LlmConfig {
    /// Create config for Claude.
    pub fn claude() -> Self {
        Self {
            model: "claude-3-5-haiku-20241022".to_string(),
            ..Self::default()
        }
    }

    /// Create config for OpenAI.
    pub fn openai() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            json_mode: true,
            ..Self::default()
        }
    }

    /// Create config for Ollama.
    pub fn ollama() -> Self {
        Self {
            model: "llama3.2".to_string(),
            timeout_secs: 120, // Local models can be slower
            ..Self::default()
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set retry count and delay.
    pub fn with_retries(mut self, max_retries: u32, retry_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Toggle JSON-only responses.
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

/// Core trait for generative backends.
///
/// Implementors only provide raw completion. The schema-constrained
/// operations used by the pipeline are provided on top of it through
/// [`structured::generate`], so every backend is interchangeable.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &str;

    /// Get the current configuration.
    fn config(&self) -> &LlmConfig;

    /// Generate a completion for a prompt.
    async fn complete(&self, prompt: &str, system: Option<&str>) -> LlmResult<String>;

    /// Translate content to English.
    async fn translate(&self, content: &str) -> LlmResult<String> {
        let out: TranslateOutput =
            structured::generate(self, &TranslatePrompt::new(content)).await?;
        Ok(out.translated_content)
    }

    /// Produce graph mutation statements describing `content`.
    async fn generate_graph_statements(&self, content: &str) -> LlmResult<Vec<String>> {
        let out: StatementList =
            structured::generate(self, &GraphExtractionPrompt::new(content)).await?;
        Ok(out.queries)
    }

    /// Name the node a question is about. The id is not checked against `nodes`.
    async fn detect_anchor_node(&self, question: &str, nodes: &[NodeRecord]) -> LlmResult<String> {
        let out: NodeDetection =
            structured::generate(self, &AnchorDetectionPrompt::new(question, nodes)).await?;
        Ok(out.node_id.trim().to_string())
    }

    /// Answer from `context` only.
    async fn answer_question(&self, question: &str, context: &[NodeRecord]) -> LlmResult<QaOutput> {
        structured::generate(self, &QuestionAnswerPrompt::new(question, context)).await
    }

    /// Judge semantic equivalence against reference answers.
    async fn validate_answer(&self, model_answer: &str, expected: &[String]) -> LlmResult<bool> {
        let out: ValidationOutput =
            structured::generate(self, &AnswerValidationPrompt::new(model_answer, expected))
                .await?;
        Ok(out.result)
    }

    /// Check if the backend is available.
    async fn health_check(&self) -> LlmResult<bool> {
        match self.complete("ping", None).await {
            Ok(_) => Ok(true),
            Err(e) => match e {
                LlmError::ConnectionFailed(_) => Ok(false),
                LlmError::AuthenticationFailed => Ok(false),
                _ => Ok(true),
            },
        }
    }
}

/// A scripted backend for testing.
///
/// Responses are keyed by a substring of the prompt. Each key holds a queue:
/// responses are handed out in order and the last one repeats. The first
/// matching key wins, in insertion order.
pub struct MockBackend {
    config: LlmConfig,
    scripts: Mutex<Vec<(String, VecDeque<String>)>>,
    fallback: String,
    transient_failures: AtomicUsize,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self {
            config: LlmConfig::default().with_retries(1, 0),
            scripts: Mutex::new(Vec::new()),
            fallback: "Mock response".to_string(),
            transient_failures: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Add a canned response for a prompt pattern.
    ///
    /// Calling this again with the same pattern queues another response.
    pub fn with_response(self, pattern: &str, response: &str) -> Self {
        {
            let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
            match scripts.iter_mut().find(|(p, _)| p == pattern) {
                Some((_, queue)) => queue.push_back(response.to_string()),
                None => scripts.push((pattern.to_string(), VecDeque::from([response.to_string()]))),
            }
        }
        self
    }

    /// Queue several responses for one pattern.
    pub fn with_responses<'a>(
        mut self,
        pattern: &str,
        responses: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        for response in responses {
            self = self.with_response(pattern, response);
        }
        self
    }

    /// Response for prompts no pattern matches.
    pub fn with_fallback(mut self, response: &str) -> Self {
        self.fallback = response.to_string();
        self
    }

    /// Fail the next `n` calls with a connection error.
    pub fn with_transient_failures(self, n: usize) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    /// Total number of `complete` calls.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls whose prompt contained `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.prompts()
            .iter()
            .filter(|p| p.contains(pattern))
            .count()
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str, _system: Option<&str>) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let failing = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(LlmError::ConnectionFailed("scripted failure".to_string()));
        }

        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        for (pattern, queue) in scripts.iter_mut() {
            if prompt.contains(pattern.as_str()) {
                let response = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                return Ok(response.unwrap_or_else(|| self.fallback.clone()));
            }
        }
        Ok(self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgqa_core::types::Properties;

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackend::new().with_response("test", "Test response");

        let response = backend.complete("This is a test", None).await.unwrap();
        assert_eq!(response, "Test response");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_queue_repeats_last() {
        let backend = MockBackend::new().with_responses("q", ["one", "two"]);

        assert_eq!(backend.complete("q", None).await.unwrap(), "one");
        assert_eq!(backend.complete("q", None).await.unwrap(), "two");
        assert_eq!(backend.complete("q", None).await.unwrap(), "two");
        assert_eq!(backend.complete("other", None).await.unwrap(), "Mock response");
    }

    #[tokio::test]
    async fn test_mock_answer_sequence() {
        let backend = MockBackend::new().with_responses(
            QuestionAnswerPrompt::TASK,
            [
                r#"{"success": false}"#,
                r#"{"success": true, "answer": "Denver Broncos"}"#,
            ],
        );

        let first = backend.answer_question("Who won?", &[]).await.unwrap();
        let second = backend.answer_question("Who won?", &[]).await.unwrap();
        assert!(!first.success);
        assert_eq!(second.answer.as_deref(), Some("Denver Broncos"));
        assert_eq!(backend.calls_matching(QuestionAnswerPrompt::TASK), 2);
    }

    #[tokio::test]
    async fn test_detect_anchor_trims_id() {
        let backend = MockBackend::new()
            .with_response(AnchorDetectionPrompt::TASK, r#"{"node_id": " n4 "}"#);
        let nodes = vec![NodeRecord::new("n4", vec![], Properties::new())];

        let id = backend.detect_anchor_node("Where?", &nodes).await.unwrap();
        assert_eq!(id, "n4");
    }

    #[tokio::test]
    async fn test_validate_answer() {
        let backend = MockBackend::new()
            .with_response(AnswerValidationPrompt::TASK, r#"{"result": true}"#);

        let ok = backend
            .validate_answer("Broncos", &["Denver Broncos".to_string()])
            .await
            .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn test_health_check_reports_unreachable() {
        let backend = MockBackend::new().with_transient_failures(1);
        assert!(!backend.health_check().await.unwrap());
        assert!(backend.health_check().await.unwrap());
    }

    #[test]
    fn test_config_builders() {
        let claude = LlmConfig::claude();
        assert!(claude.model.contains("claude"));

        let openai = LlmConfig::openai();
        assert!(openai.model.contains("gpt"));
        assert!(openai.json_mode);

        let ollama = LlmConfig::ollama();
        assert!(ollama.model.contains("llama"));

        let tuned = LlmConfig::default().with_temperature(5.0).with_retries(3, 10);
        assert_eq!(tuned.temperature, 2.0);
        assert_eq!(tuned.max_retries, 3);
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout(30).is_transient());
        assert!(LlmError::RateLimited(60).is_transient());
        assert!(!LlmError::AuthenticationFailed.is_transient());
        let schema = LlmError::SchemaMismatch {
            schema: "QaOutput".into(),
            reason: "missing field".into(),
        };
        assert!(!schema.is_transient());
        assert!(schema.is_schema_mismatch());
    }
}
