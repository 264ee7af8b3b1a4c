#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::AssistantError;
use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;
use crate::routing::{AmbiguousPolicy, RoutingPolicyKind};

const APP_DIR_NAME: &str = "rag-assistant";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub embedding: OllamaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Language model connection settings
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Attempts per answer request; relevance classification is always sent once
    pub retry_attempts: u32,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub log_requests: bool,
    /// Populated once at startup, never written to disk
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.3,
            timeout_seconds: 60,
            retry_attempts: 1,
            api_key_env: "GEMINI_KEY".to_string(),
            log_requests: true,
            api_key: None,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("retry_attempts", &self.retry_attempts)
            .field("api_key_env", &self.api_key_env)
            .field("log_requests", &self.log_requests)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
    pub timeout_seconds: u64,
    /// Number of threads embedding batches in parallel during the index build
    pub workers: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm:latest".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout_seconds: 30,
            workers: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub max_results: usize,
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 3,
            min_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    pub policy: RoutingPolicyKind,
    /// Subject the corpus covers, as phrased in the classification prompt
    pub domain: String,
    pub ambiguous: AmbiguousPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            policy: RoutingPolicyKind::LlmClassifier,
            domain: "l'intelligence artificielle".to_string(),
            ambiguous: AmbiguousPolicy::Retrieve,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_messages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { max_messages: 10 }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 2 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid worker count: {0} (must be between 1 and 64)")]
    InvalidWorkers(usize),
    #[error("Invalid API key variable name: '{0}' (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Invalid max segment size: {0} (must be between 1 and 100000)")]
    InvalidMaxSegmentSize(usize),
    #[error("Overlap ({0}) must be smaller than max segment size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid max results: {0} (must be between 1 and 100)")]
    InvalidMaxResults(usize),
    #[error("Invalid min score: {0} (must be between -1.0 and 1.0)")]
    InvalidMinScore(f32),
    #[error("Invalid routing domain: '{0}' (cannot be empty)")]
    InvalidDomain(String),
    #[error("Invalid memory size: {0} (must be between 1 and 1000 messages)")]
    InvalidMemorySize(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default location of the configuration directory
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, or defaults when it does not exist
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)?;

        let mut config: Config = toml::from_str(&content)?;
        config.base_dir = config_dir.as_ref().to_path_buf();
        config.validate()?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Fill in the API key from the variable named by `chat.api_key_env`.
    ///
    /// `lookup` is called exactly once; `std::env::var` in production.
    #[inline]
    pub fn resolve_api_key<F>(mut self, lookup: F) -> crate::Result<Self>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let key = lookup(&self.chat.api_key_env).filter(|key| !key.trim().is_empty());
        let Some(key) = key else {
            return Err(AssistantError::MissingCredential {
                env_var: self.chat.api_key_env.clone(),
            });
        };
        self.chat.api_key = Some(key);
        Ok(self)
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.embedding.ollama_url()
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chat.validate()?;
        self.embedding.validate()?;
        self.validate_chunking_config()?;
        self.validate_retrieval_config()?;

        if self.routing.domain.trim().is_empty() {
            return Err(ConfigError::InvalidDomain(self.routing.domain.clone()));
        }

        if !(1..=1000).contains(&self.memory.max_messages) {
            return Err(ConfigError::InvalidMemorySize(self.memory.max_messages));
        }

        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(1..=100_000).contains(&config.max_segment_size) {
            return Err(ConfigError::InvalidMaxSegmentSize(config.max_segment_size));
        }

        if config.overlap >= config.max_segment_size {
            return Err(ConfigError::OverlapTooLarge(
                config.overlap,
                config.max_segment_size,
            ));
        }

        Ok(())
    }

    fn validate_retrieval_config(&self) -> Result<(), ConfigError> {
        let config = &self.retrieval;

        if !(1..=100).contains(&config.max_results) {
            return Err(ConfigError::InvalidMaxResults(config.max_results));
        }

        if !(-1.0..=1.0).contains(&config.min_score) {
            return Err(ConfigError::InvalidMinScore(config.min_score));
        }

        Ok(())
    }
}

impl ChatConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }

        Ok(())
    }

    #[inline]
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        // A trailing slash keeps `Url::join` from dropping the API version segment
        let mut url_str = self.base_url.clone();
        if !url_str.ends_with('/') {
            url_str.push('/');
        }
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(2..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=64).contains(&self.workers) {
            return Err(ConfigError::InvalidWorkers(self.workers));
        }

        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    #[inline]
    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    #[inline]
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    #[inline]
    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    #[inline]
    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(2..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}
