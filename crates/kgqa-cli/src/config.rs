//! Configuration management for the kgqa CLI.

use anyhow::{bail, Context, Result};
use kgqa::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "kgqa.toml";

/// kgqa project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub corpus: CorpusSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default)]
    pub backend: BackendKind,
    /// Provider default when unset.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Provider default when unset.
    #[serde(default)]
    pub json_mode: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_neo4j_uri")]
    pub uri: String,
    #[serde(default = "default_neo4j_user")]
    pub user: String,
    /// Falls back to `NEO4J_PASSWORD`.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusSection {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub article: Option<usize>,
}

// Default value functions
fn default_temperature() -> f32 { 0.0 }
fn default_max_tokens() -> u32 { 4096 }
fn default_timeout_secs() -> u32 { 120 }
fn default_max_retries() -> u32 { 1 }
fn default_retry_delay_ms() -> u64 { 500 }
fn default_store_backend() -> String { "sqlite".to_string() }
fn default_store_path() -> PathBuf { PathBuf::from(".kgqa/graph.db") }
fn default_neo4j_uri() -> String { "bolt://localhost:7687".to_string() }
fn default_neo4j_user() -> String { "neo4j".to_string() }

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            endpoint: None,
            json_mode: None,
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
            uri: default_neo4j_uri(),
            user: default_neo4j_user(),
            password: None,
        }
    }
}

impl LlmSection {
    /// Provider defaults overlaid with this section.
    pub fn to_llm_config(&self) -> LlmConfig {
        let mut config = self
            .backend
            .default_config()
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_timeout(self.timeout_secs)
            .with_retries(self.max_retries, self.retry_delay_ms);
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(json_mode) = self.json_mode {
            config = config.with_json_mode(json_mode);
        }
        config
    }
}

impl StoreSection {
    pub fn to_store_config(&self) -> Result<StoreConfig> {
        check_store_kind(&self.backend)
            .with_context(|| format!("Unusable store backend: {}", self.backend))?;

        match self.backend.as_str() {
            "memory" => Ok(StoreConfig::in_memory()),
            "sqlite" => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                Ok(StoreConfig::sqlite(&self.path))
            }
            #[cfg(feature = "neo4j")]
            "neo4j" => {
                let password = match &self.password {
                    Some(p) => p.clone(),
                    None => std::env::var("NEO4J_PASSWORD")
                        .context("store.password is unset and NEO4J_PASSWORD is not set")?,
                };
                Ok(StoreConfig::neo4j(&self.uri, &self.user, password))
            }
            other => bail!("Store backend not available in this build: {}", other),
        }
    }
}

impl Config {
    /// Load config from `KGQA_CONFIG`, the nearest kgqa.toml, or the user config dir.
    pub fn load() -> Result<Self> {
        match find_config_file() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config");
                Self::load_from(&path)
            }
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                Ok(Config::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .retrieval
            .validate()
            .with_context(|| format!("Invalid [retrieval] in {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// Find the config file: `KGQA_CONFIG`, then the current or parent directories, then the user config dir.
fn find_config_file() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("KGQA_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    if let Ok(mut dir) = std::env::current_dir() {
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
    }

    dirs::config_dir()
        .map(|d| d.join("kgqa").join(CONFIG_FILE))
        .filter(|p| p.exists())
}

/// Get the kgqa data directory (.kgqa/).
pub fn data_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(".kgqa"))
}
