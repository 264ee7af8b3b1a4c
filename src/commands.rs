use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use tracing::info;

use crate::Result;
use crate::augment::{EmbeddingRetriever, RetrievalAugmentor};
use crate::config::Config;
use crate::document::load_documents;
use crate::embeddings::{Embedder, OllamaClient};
use crate::indexer::Indexer;
use crate::llm::{ChatModel, GeminiClient};
use crate::memory::ConversationMemory;
use crate::routing::RoutingPolicy;
use crate::session::{ChatSession, run_conversation};

/// Index `documents` and hold a conversation over stdin/stdout.
///
/// Anything that fails before the first prompt aborts the command.
#[inline]
pub fn start_chat(config_dir: &Path, documents: &[PathBuf]) -> Result<()> {
    let config = Config::load(config_dir)?;
    config.validate()?;
    let config = config.resolve_api_key(|name| std::env::var(name).ok())?;

    let documents = load_documents(documents)?;
    info!("Loaded {} documents", documents.len());

    let ollama = OllamaClient::new(&config.embedding)?;
    ollama.health_check()?;
    let embedder: Arc<dyn Embedder> = Arc::new(ollama);

    let (index, stats) = Indexer::from_config(Arc::clone(&embedder), &config).build(&documents)?;
    eprintln!(
        "{} {} segments from {} documents in {:.1}s",
        style("Indexed").green().bold(),
        index.len(),
        stats.documents_processed,
        stats.duration.as_secs_f64()
    );

    let gemini = GeminiClient::new(&config.chat)?;
    let classifier: Arc<dyn ChatModel> = Arc::new(gemini.clone().single_attempt());
    let model: Arc<dyn ChatModel> = Arc::new(gemini);
    let router = RoutingPolicy::from_config(&config.routing).with_classifier_model(classifier);
    let augmentor =
        RetrievalAugmentor::new(EmbeddingRetriever::new(index, embedder, &config.retrieval));
    let memory = ConversationMemory::new(config.memory.max_messages)?;

    let mut session = ChatSession::new(model, router, augmentor, memory)?;
    run_conversation(&mut session, io::stdin().lock(), io::stdout().lock())
}
