//! Ollama backend for local LLM inference.
//!
//! Requires the `local` feature and a running Ollama instance.

use crate::backend::{LlmBackend, LlmConfig, LlmError, LlmResult};
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Ollama API request.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama backend for local LLM inference.
pub struct OllamaBackend {
    endpoint: String,
    config: LlmConfig,
    client: reqwest::Client,
}

impl OllamaBackend {
    /// Create a new Ollama backend.
    pub fn new(endpoint: &str) -> LlmResult<Self> {
        Self::with_config(endpoint, LlmConfig::ollama())
    }

    /// Create with custom config.
    pub fn with_config(endpoint: &str, config: LlmConfig) -> LlmResult<Self> {
        let client = http::build_client(&config)?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            config,
            client,
        })
    }

    /// Create with default localhost endpoint.
    pub fn localhost() -> LlmResult<Self> {
        Self::new(DEFAULT_OLLAMA_ENDPOINT)
    }

    /// Set the model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    /// Make a request to Ollama.
    async fn request(&self, prompt: &str, system: Option<&str>) -> LlmResult<String> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            system: system.map(|s| s.to_string()),
            stream: false,
            format: self.config.json_mode.then_some("json"),
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                http::send_error(
                    e,
                    &format!("Ollama at {}. Is Ollama running?", self.endpoint),
                    &self.config,
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 {
                return Err(LlmError::ModelNotFound(format!(
                    "Model '{}' not found. Run: ollama pull {}",
                    self.config.model, self.config.model
                )));
            }

            return Err(LlmError::ApiError(format!(
                "Ollama error {}: {}",
                status, body
            )));
        }

        let resp: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(tokens) = resp.eval_count {
            debug!(model = %self.config.model, eval_count = tokens, "Ollama usage");
        }

        Ok(resp.response)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete(&self, prompt: &str, system: Option<&str>) -> LlmResult<String> {
        self.request(prompt, system).await
    }
}
