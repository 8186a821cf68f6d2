//! OpenAI backend for GPT models.
//!
//! Requires the `api` feature and an OpenAI API key. Any endpoint speaking the
//! chat-completions protocol can be used through [`OpenAiBackend::with_endpoint`].

use crate::backend::{LlmBackend, LlmConfig, LlmError, LlmResult};
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI API request.
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

/// OpenAI API response.
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

/// OpenAI backend for GPT models.
///
/// # Example
///
/// ```rust,ignore
/// use kgqa_llm::{LlmBackend, OpenAiBackend};
///
/// let backend = OpenAiBackend::from_env()?;
/// let statements = backend.generate_graph_statements("Denver Broncos won Super Bowl 50").await?;
/// ```
pub struct OpenAiBackend {
    api_key: String,
    config: LlmConfig,
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiBackend {
    /// Create a new OpenAI backend.
    pub fn new(api_key: &str) -> LlmResult<Self> {
        Self::with_config(api_key, LlmConfig::openai())
    }

    /// Create with custom config.
    pub fn with_config(api_key: &str, config: LlmConfig) -> LlmResult<Self> {
        let client = http::build_client(&config)?;

        Ok(Self {
            api_key: api_key.to_string(),
            config,
            client,
            endpoint: OPENAI_API_URL.to_string(),
        })
    }

    /// Create from environment variable.
    pub fn from_env() -> LlmResult<Self> {
        Self::from_env_with_config(LlmConfig::openai())
    }

    /// Create from environment variable with custom config.
    pub fn from_env_with_config(config: LlmConfig) -> LlmResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::MissingApiKey("OPENAI_API_KEY".to_string()))?;
        Self::with_config(&api_key, config)
    }

    /// Set the model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    /// Use a custom endpoint (Azure OpenAI, gateways, compatible APIs).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Make a request to OpenAI API.
    async fn request(&self, prompt: &str, system: Option<&str>) -> LlmResult<String> {
        let mut messages = Vec::new();

        if let Some(sys) = system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: sys.to_string(),
            });
        }

        messages.push(OpenAiMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = OpenAiRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: self.config.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| http::send_error(e, "OpenAI API", &self.config))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            match status.as_u16() {
                401 => return Err(LlmError::AuthenticationFailed),
                429 => return Err(LlmError::RateLimited(60)),
                404 => return Err(LlmError::ModelNotFound(self.config.model.clone())),
                _ => {}
            }

            let detail = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::ApiError(format!(
                "OpenAI API error {}: {}",
                status, detail
            )));
        }

        let resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &resp.usage {
            debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI usage"
            );
        }

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str, system: Option<&str>) -> LlmResult<String> {
        self.request(prompt, system).await
    }
}
