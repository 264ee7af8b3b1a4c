#[cfg(test)]
mod tests;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::ChatConfig;
use crate::http::HttpClient;
use crate::{AssistantError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    #[inline]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    #[inline]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Opaque text-completion service.
///
/// `messages` are oldest first and end with the user message to answer.
pub trait ChatModel: Send + Sync {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    base_url: Url,
    model: String,
    temperature: f32,
    api_key: String,
    log_requests: bool,
    http: HttpClient,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("log_requests", &self.log_requests)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Build a client from validated settings; the API key must already be resolved
    #[inline]
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AssistantError::MissingCredential {
                env_var: config.api_key_env.clone(),
            })?;
        let base_url = config.base_url()?;

        info!("Using chat model {} at {}", config.model, base_url);

        Ok(Self {
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            log_requests: config.log_requests,
            http: HttpClient::new(
                Duration::from_secs(config.timeout_seconds),
                config.retry_attempts,
            ),
        })
    }

    #[inline]
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    /// Same client with retries disabled, for calls that must be made once
    #[inline]
    pub fn single_attempt(mut self) -> Self {
        self.http = self.http.with_retry_attempts(1);
        self
    }

    fn endpoint(&self) -> Result<Url> {
        self.base_url
            .join(&format!("models/{}:generateContent", self.model))
            .map_err(|e| AssistantError::Config(format!("Failed to build Gemini URL: {}", e)))
    }
}

impl ChatModel for GeminiClient {
    #[inline]
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            return Err(AssistantError::Model("No messages to send".to_string()));
        }

        let request = GenerateRequest {
            contents: messages
                .iter()
                .map(|message| Content {
                    role: match message.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    },
                    parts: [Part {
                        text: &message.text,
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        if self.log_requests {
            debug!(
                "Gemini request: {}",
                serde_json::to_string(&request).unwrap_or_default()
            );
        }

        let url = self.endpoint()?;
        let raw: serde_json::Value =
            self.http
                .post_json(&url, &[("x-goog-api-key", self.api_key.as_str())], &request)?;

        if self.log_requests {
            debug!("Gemini response: {}", raw);
        }

        let response: GenerateResponse = serde_json::from_value(raw)
            .map_err(|e| AssistantError::Model(format!("Unexpected response shape: {}", e)))?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Model("Response contained no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AssistantError::Model(
                "Response candidate contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}
