//! Backend selection from configuration.

use crate::backend::{LlmBackend, LlmConfig, LlmError, LlmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which generative backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    OpenAi,
    Claude,
    Ollama,
}

impl BackendKind {
    /// Provider defaults for this backend.
    pub fn default_config(&self) -> LlmConfig {
        match self {
            BackendKind::OpenAi => LlmConfig::openai(),
            BackendKind::Claude => LlmConfig::claude(),
            BackendKind::Ollama => LlmConfig::ollama(),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::OpenAi => write!(f, "openai"),
            BackendKind::Claude => write!(f, "claude"),
            BackendKind::Ollama => write!(f, "ollama"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(BackendKind::OpenAi),
            "claude" | "anthropic" => Ok(BackendKind::Claude),
            "ollama" => Ok(BackendKind::Ollama),
            other => Err(LlmError::Unsupported(other.to_string())),
        }
    }
}

/// Shared handle to a backend.
pub type DynLlmBackend = Arc<dyn LlmBackend>;

/// Create a backend from configuration.
///
/// API keys come from the environment. `endpoint` overrides the provider URL
/// where the backend supports it.
///
/// # Errors
/// Returns [`LlmError::Unsupported`] if the backend was not compiled in, or
/// [`LlmError::MissingApiKey`] if its key is not set.
#[allow(unused_variables)]
pub fn create_backend(
    kind: BackendKind,
    config: LlmConfig,
    endpoint: Option<&str>,
) -> LlmResult<DynLlmBackend> {
    match kind {
        #[cfg(feature = "api")]
        BackendKind::OpenAi => {
            let mut backend = crate::openai::OpenAiBackend::from_env_with_config(config)?;
            if let Some(url) = endpoint {
                backend = backend.with_endpoint(url);
            }
            Ok(Arc::new(backend))
        }

        #[cfg(feature = "api")]
        BackendKind::Claude => Ok(Arc::new(
            crate::claude::ClaudeBackend::from_env_with_config(config)?,
        )),

        #[cfg(feature = "local")]
        BackendKind::Ollama => Ok(Arc::new(crate::ollama::OllamaBackend::with_config(
            endpoint.unwrap_or(crate::ollama::DEFAULT_OLLAMA_ENDPOINT),
            config,
        )?)),

        #[allow(unreachable_patterns)]
        other => Err(LlmError::Unsupported(format!(
            "{} (enable the `{}` feature)",
            other,
            if other == BackendKind::Ollama { "local" } else { "api" }
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("OpenAI".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!("anthropic".parse::<BackendKind>().unwrap(), BackendKind::Claude);
        assert!("bedrock".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_kind_serde() {
        let kind: BackendKind = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(kind, BackendKind::Ollama);
        assert_eq!(kind.to_string(), "ollama");
        assert!(kind.default_config().model.contains("llama"));
    }

    #[cfg(feature = "local")]
    #[test]
    fn test_create_ollama() {
        let backend = create_backend(BackendKind::Ollama, LlmConfig::ollama(), None).unwrap();
        assert_eq!(backend.name(), "ollama");
    }

    #[cfg(not(feature = "api"))]
    #[test]
    fn test_api_backends_need_feature() {
        let err = create_backend(BackendKind::Claude, LlmConfig::claude(), None)
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::Unsupported(_)));
    }
}
