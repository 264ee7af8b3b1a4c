
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{Embedder, Embedding};
use crate::config::OllamaConfig;
use crate::http::HttpClient;
use crate::{AssistantError, Result};

/// Output size of all-MiniLM-L6-v2
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Embedding service backed by a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    dimension: usize,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config.ollama_url()?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            dimension: config.embedding_dimension as usize,
            http: HttpClient::new(
                Duration::from_secs(config.timeout_seconds),
                DEFAULT_RETRY_ATTEMPTS,
            ),
        })
    }

    #[inline]
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    /// Check the server is reachable and serves the configured model
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;

        if models.iter().any(|m| m.name == self.model) {
            info!(
                "Health check passed for Ollama server at {} with model {}",
                self.base_url, self.model
            );
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(AssistantError::Embedding(format!(
                "Model '{}' is not available. Available models: {:?}",
                self.model, available_models
            )))
        }
    }

    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;
        debug!("Fetching available models from {}", url);

        let response_text = self.http.get_text(&url)?;
        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| AssistantError::Embedding(format!("Failed to parse models: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AssistantError::Config(format!("Failed to build Ollama URL: {}", e)))
    }

    fn embed_single_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let url = self.endpoint("/api/embed")?;
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response: EmbedResponse = self.http.post_json(&url, &[], &request)?;

        if response.embeddings.len() != texts.len() {
            return Err(AssistantError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        if let Some(wrong) = response
            .embeddings
            .iter()
            .find(|embedding| embedding.len() != self.dimension)
        {
            return Err(AssistantError::DimensionMismatch {
                expected: self.dimension,
                actual: wrong.len(),
            });
        }

        Ok(response.embeddings)
    }
}

impl Embedder for OllamaClient {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| AssistantError::Embedding("Ollama returned no embedding".to_string()))
    }

    #[inline]
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.iter().any(|text| text.trim().is_empty()) {
            return Err(AssistantError::EmptyInput);
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size as usize) {
            results.extend(self.embed_single_batch(chunk)?);
        }

        debug!(
            "Generated {} embeddings with {} dimensions",
            results.len(),
            self.dimension
        );
        Ok(results)
    }
}
