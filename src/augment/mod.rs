
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::index::{RetrievalResult, VectorIndex};
use crate::llm::ChatMessage;
use crate::memory::ConversationMemory;
use crate::prompt::PromptTemplate;
use crate::routing::Route;
use crate::Result;

pub const DEFAULT_AUGMENTATION_TEMPLATE: &str =
    "{{userMessage}}\n\nAnswer using the following information:\n{{contents}}";

/// Looks up segments relevant to a query with a fixed result policy
pub struct EmbeddingRetriever {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    min_score: f32,
}

impl std::fmt::Debug for EmbeddingRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingRetriever")
            .field("records", &self.index.len())
            .field("dimension", &self.index.dimension())
            .field("max_results", &self.max_results)
            .field("min_score", &self.min_score)
            .finish()
    }
}

impl EmbeddingRetriever {
    #[inline]
    pub fn new(index: VectorIndex, embedder: Arc<dyn Embedder>, config: &RetrievalConfig) -> Self {
        Self {
            index,
            embedder,
            max_results: config.max_results,
            min_score: config.min_score,
        }
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[inline]
    pub fn retrieve(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        let results =
            self.index
                .search_text(self.embedder.as_ref(), query, self.max_results, self.min_score)?;
        info!(
            "Retrieved {} segments (max {}, min score {})",
            results.len(),
            self.max_results,
            self.min_score
        );
        Ok(results)
    }
}

/// Everything sent to the model for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct Augmentation {
    /// History oldest first, ending with the user message to answer
    pub messages: Vec<ChatMessage>,
    pub retrieved: Vec<RetrievalResult>,
}

/// Merges retrieved context and conversation history into the model input
#[derive(Debug)]
pub struct RetrievalAugmentor {
    retriever: EmbeddingRetriever,
    template: PromptTemplate,
}

impl RetrievalAugmentor {
    #[inline]
    pub fn new(retriever: EmbeddingRetriever) -> Self {
        Self::with_template(retriever, PromptTemplate::new(DEFAULT_AUGMENTATION_TEMPLATE))
    }

    /// `template` receives `{{userMessage}}` and `{{contents}}`
    #[inline]
    pub fn with_template(retriever: EmbeddingRetriever, template: PromptTemplate) -> Self {
        Self {
            retriever,
            template,
        }
    }

    #[inline]
    pub fn retriever(&self) -> &EmbeddingRetriever {
        &self.retriever
    }

    /// Search only when the router asked for it
    #[inline]
    pub fn retrieve(&self, query: &str, route: Route) -> Result<Vec<RetrievalResult>> {
        match route {
            Route::Retrieve => self.retriever.retrieve(query),
            Route::NoRetrieval => {
                debug!("Routing skipped retrieval");
                Ok(Vec::new())
            }
        }
    }

    /// Final user message: the query itself, or the query with the
    /// retrieved segments injected, best match first
    #[inline]
    pub fn user_message(&self, query: &str, retrieved: &[RetrievalResult]) -> Result<String> {
        if retrieved.is_empty() {
            return Ok(query.to_string());
        }

        let contents = retrieved
            .iter()
            .map(|result| result.segment.text.trim())
            .join("\n\n");
        self.template
            .render(&[("userMessage", query), ("contents", contents.as_str())])
    }

    /// History followed by the final user message
    #[inline]
    pub fn compose(
        &self,
        query: &str,
        retrieved: &[RetrievalResult],
        memory: &ConversationMemory,
    ) -> Result<Vec<ChatMessage>> {
        let user_message = self.user_message(query, retrieved)?;
        let mut messages: Vec<ChatMessage> = memory.iter().cloned().collect();
        messages.push(ChatMessage::user(user_message));
        Ok(messages)
    }

    #[inline]
    pub fn augment(
        &self,
        query: &str,
        route: Route,
        memory: &ConversationMemory,
    ) -> Result<Augmentation> {
        let retrieved = self.retrieve(query, route)?;
        let messages = self.compose(query, &retrieved, memory)?;
        Ok(Augmentation {
            messages,
            retrieved,
        })
    }
}
