// Embeddings module
// Document chunking plus the embedding service the index is built with

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, Segment, chunk_document};
pub use ollama::OllamaClient;

use crate::Result;

/// Fixed-length vector representation of a piece of text
pub type Embedding = Vec<f32>;

/// Maps text to embeddings.
///
/// Implementations must be deterministic for identical input and reject
/// blank text with [`AssistantError::EmptyInput`](crate::AssistantError::EmptyInput)
/// rather than inventing a vector for it.
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts, returning vectors in input order
    #[inline]
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
