use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key not found. Set the {env_var} environment variable")]
    MissingCredential { env_var: String },

    #[error("Failed to load document {}: {message}", path.display())]
    Document { path: PathBuf, message: String },

    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Got {embeddings} embeddings for {segments} segments")]
    ArityMismatch { embeddings: usize, segments: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Language model error: {0}")]
    Model(String),

    #[error("Query routing error: {0}")]
    Routing(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl AssistantError {
    /// Whether a conversation can carry on after this error.
    ///
    /// Everything else is only ever raised before the session loop starts.
    #[inline]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::Model(_)
                | Self::Routing(_)
                | Self::Template(_)
                | Self::Embedding(_)
                | Self::EmptyInput
        )
    }
}

impl From<config::ConfigError> for AssistantError {
    #[inline]
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub mod augment;
pub mod commands;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod http;
pub mod index;
pub mod indexer;
pub mod llm;
pub mod memory;
pub mod prompt;
pub mod routing;
pub mod session;
