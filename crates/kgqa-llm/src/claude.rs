//! Claude backend for Anthropic API.
//!
//! Requires the `api` feature and an Anthropic API key.

use crate::backend::{LlmBackend, LlmConfig, LlmError, LlmResult};
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude API request.
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

/// Claude API response.
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    #[serde(default)]
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeError {
    error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
    message: String,
}

/// Claude backend for Anthropic API.
pub struct ClaudeBackend {
    api_key: String,
    config: LlmConfig,
    client: reqwest::Client,
}

impl ClaudeBackend {
    /// Create a new Claude backend.
    pub fn new(api_key: &str) -> LlmResult<Self> {
        Self::with_config(api_key, LlmConfig::claude())
    }

    /// Create with custom config.
    pub fn with_config(api_key: &str, config: LlmConfig) -> LlmResult<Self> {
        let client = http::build_client(&config)?;

        Ok(Self {
            api_key: api_key.to_string(),
            config,
            client,
        })
    }

    /// Create from environment variable.
    pub fn from_env() -> LlmResult<Self> {
        Self::from_env_with_config(LlmConfig::claude())
    }

    /// Create from environment variable with custom config.
    pub fn from_env_with_config(config: LlmConfig) -> LlmResult<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::MissingApiKey("ANTHROPIC_API_KEY".to_string()))?;
        Self::with_config(&api_key, config)
    }

    /// Set the model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    /// Use Claude Sonnet.
    pub fn sonnet(mut self) -> Self {
        self.config.model = "claude-3-5-sonnet-20241022".to_string();
        self
    }

    /// Use Claude Haiku (default, fastest).
    pub fn haiku(mut self) -> Self {
        self.config.model = "claude-3-5-haiku-20241022".to_string();
        self
    }

    /// Make a request to Claude API.
    async fn request(&self, prompt: &str, system: Option<&str>) -> LlmResult<String> {
        let request = ClaudeRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: system.map(|s| s.to_string()),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| http::send_error(e, "Anthropic API", &self.config))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            match status.as_u16() {
                401 => return Err(LlmError::AuthenticationFailed),
                429 | 529 => return Err(LlmError::RateLimited(60)),
                404 => return Err(LlmError::ModelNotFound(self.config.model.clone())),
                _ => {}
            }

            let detail = serde_json::from_str::<ClaudeError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::ApiError(format!(
                "Claude API error {}: {}",
                status, detail
            )));
        }

        let resp: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &resp.usage {
            debug!(
                model = %self.config.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Claude usage"
            );
        }

        resp.content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| LlmError::InvalidResponse("No content in response".to_string()))
    }
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    fn name(&self) -> &str {
        "claude"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str, system: Option<&str>) -> LlmResult<String> {
        self.request(prompt, system).await
    }
}
