// Indexer module
// One-shot build phase: documents are chunked, embedded in parallel and
// appended to a fresh vector index in a single batch


use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::Document;
use crate::embeddings::chunking::{ChunkingConfig, Segment, chunk_document};
use crate::embeddings::{Embedder, Embedding};
use crate::index::VectorIndex;
use crate::{AssistantError, Result};

/// Builds a [`VectorIndex`] from loaded documents
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    chunking_config: ChunkingConfig,
    batch_size: usize,
    workers: usize,
    show_progress: bool,
}

/// Statistics about one index build
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexingStats {
    pub documents_processed: usize,
    pub segments_created: usize,
    pub blank_segments_skipped: usize,
    pub embeddings_generated: usize,
    pub duration: Duration,
}

impl Indexer {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, chunking_config: ChunkingConfig) -> Self {
        Self {
            embedder,
            chunking_config,
            batch_size: 16,
            workers: 1,
            show_progress: false,
        }
    }

    /// Indexer using the chunking and embedding settings of `config`
    #[inline]
    pub fn from_config(embedder: Arc<dyn Embedder>, config: &Config) -> Self {
        Self::new(embedder, config.chunking.clone())
            .with_batch_size(config.embedding.batch_size as usize)
            .with_workers(config.embedding.workers)
            .with_progress(console::user_attended_stderr())
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Chunk every document in order, dropping whitespace-only segments
    #[inline]
    pub fn chunk_documents(
        &self,
        documents: &[Document],
        stats: &mut IndexingStats,
    ) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();

        for document in documents {
            let chunks = chunk_document(document, &self.chunking_config)?;
            let chunked = chunks.len();
            let before_len = segments.len();
            segments.extend(chunks.into_iter().filter(|s| !s.text.trim().is_empty()));

            let kept = segments.len() - before_len;
            stats.blank_segments_skipped += chunked - kept;
            stats.segments_created += kept;
            stats.documents_processed += 1;

            debug!(
                "Chunked {} into {} segments",
                document.path.display(),
                kept
            );
        }

        Ok(segments)
    }

    /// Embed segments on a pool of worker threads, keeping input order.
    ///
    /// The first failing batch aborts the whole run.
    #[inline]
    pub fn embed_segments(&self, segments: &[Segment]) -> Result<Vec<Embedding>> {
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("embed-{}", i))
            .build()
            .map_err(|e| AssistantError::Embedding(format!("Failed to start workers: {}", e)))?;

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let bar = self.progress_bar(texts.len());

        let batches: Result<Vec<Vec<Embedding>>> = pool.install(|| {
            texts
                .par_chunks(self.batch_size)
                .map(|batch| -> Result<Vec<Embedding>> {
                    let embeddings = self.embedder.embed_batch(batch)?;
                    bar.inc(batch.len() as u64);
                    Ok(embeddings)
                })
                .collect()
        });

        let embeddings: Vec<Embedding> = match batches {
            Ok(batches) => batches.into_iter().flatten().collect(),
            Err(e) => {
                bar.abandon_with_message("failed");
                return Err(e);
            }
        };
        bar.finish_and_clear();

        if embeddings.len() != segments.len() {
            return Err(AssistantError::ArityMismatch {
                embeddings: embeddings.len(),
                segments: segments.len(),
            });
        }

        Ok(embeddings)
    }

    /// Chunk, embed and index `documents`
    #[inline]
    pub fn build(&self, documents: &[Document]) -> Result<(VectorIndex, IndexingStats)> {
        let start = Instant::now();
        let mut stats = IndexingStats::default();

        info!(
            "Indexing {} documents (max segment {} chars, overlap {})",
            documents.len(),
            self.chunking_config.max_segment_size,
            self.chunking_config.overlap
        );

        let segments = self.chunk_documents(documents, &mut stats)?;
        if stats.blank_segments_skipped > 0 {
            warn!(
                "Skipped {} whitespace-only segments",
                stats.blank_segments_skipped
            );
        }

        let embeddings = self.embed_segments(&segments)?;
        stats.embeddings_generated = embeddings.len();

        let mut index = VectorIndex::new(self.embedder.dimension());
        index.add_all(embeddings, segments)?;

        stats.duration = start.elapsed();
        info!(
            "Indexed {} segments from {} documents in {:.2}s",
            index.len(),
            stats.documents_processed,
            stats.duration.as_secs_f64()
        );

        Ok((index, stats))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if self.show_progress {
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding segments {wide_bar}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        }
    }
}
