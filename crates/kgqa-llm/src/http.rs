//! Shared HTTP plumbing for the remote backends.

use crate::backend::{LlmConfig, LlmError, LlmResult};
use std::time::Duration;

/// Build a client bounded by the configured timeout.
pub(crate) fn build_client(config: &LlmConfig) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs as u64))
        .build()
        .map_err(|e| LlmError::ConnectionFailed(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport error onto the retry-aware error kinds.
pub(crate) fn send_error(e: reqwest::Error, target: &str, config: &LlmConfig) -> LlmError {
    if e.is_connect() {
        LlmError::ConnectionFailed(format!("Cannot connect to {}", target))
    } else if e.is_timeout() {
        LlmError::Timeout(config.timeout_secs)
    } else {
        LlmError::ApiError(e.to_string())
    }
}
