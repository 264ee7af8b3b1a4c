
use std::fmt;

use tracing::{debug, info};
use uuid::Uuid;

use crate::embeddings::chunking::Segment;
use crate::embeddings::{Embedder, Embedding};
use crate::{AssistantError, Result};

/// Identifier handed out by [`VectorIndex::add`], unique for the index lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(Uuid);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
struct IndexRecord {
    id: RecordId,
    /// Stored unit-normalized so similarity is a plain dot product
    vector: Embedding,
    segment: Segment,
}

/// A segment matched by a search, with its cosine similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub id: RecordId,
    pub segment: Segment,
    pub score: f32,
}

/// In-memory store of embedded segments answering nearest-neighbour queries
/// by exhaustive cosine similarity.
///
/// Records are only ever appended; the index is rebuilt when the corpus changes.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    records: Vec<IndexRecord>,
}

impl VectorIndex {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: Vec::new(),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Segments in insertion order
    #[inline]
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.records.iter().map(|record| &record.segment)
    }

    #[inline]
    pub fn add(&mut self, embedding: Embedding, segment: Segment) -> Result<RecordId> {
        self.check_dimension(&embedding)?;
        Ok(self.push(embedding, segment))
    }

    /// Append a whole batch, or nothing if any embedding is invalid
    #[inline]
    pub fn add_all(
        &mut self,
        embeddings: Vec<Embedding>,
        segments: Vec<Segment>,
    ) -> Result<Vec<RecordId>> {
        if embeddings.len() != segments.len() {
            return Err(AssistantError::ArityMismatch {
                embeddings: embeddings.len(),
                segments: segments.len(),
            });
        }
        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }

        self.records.reserve(embeddings.len());
        let ids: Vec<RecordId> = embeddings
            .into_iter()
            .zip(segments)
            .map(|(embedding, segment)| self.push(embedding, segment))
            .collect();

        info!("Added {} records to the index ({} total)", ids.len(), self.len());
        Ok(ids)
    }

    /// Return at most `max_results` records scoring at least `min_score`,
    /// best first. Equal scores keep insertion order.
    #[inline]
    pub fn search(
        &self,
        query: &[f32],
        max_results: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievalResult>> {
        if self.records.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query)?;

        let query = normalize(query);
        let mut scored: Vec<(f32, &IndexRecord)> = self
            .records
            .iter()
            .map(|record| (dot(&query, &record.vector), record))
            .filter(|(score, _)| *score >= min_score)
            .collect();

        // Stable sort, so ties stay in insertion order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(max_results);

        debug!(
            "Search over {} records returned {} results (min score {})",
            self.records.len(),
            scored.len(),
            min_score
        );

        Ok(scored
            .into_iter()
            .map(|(score, record)| RetrievalResult {
                id: record.id,
                segment: record.segment.clone(),
                score,
            })
            .collect())
    }

    /// Embed `query` and search for it
    #[inline]
    pub fn search_text<E: Embedder + ?Sized>(
        &self,
        embedder: &E,
        query: &str,
        max_results: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievalResult>> {
        if self.records.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = embedder.embed(query)?;
        self.search(&embedding, max_results, min_score)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(AssistantError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            })
        }
    }

    fn push(&mut self, embedding: Embedding, segment: Segment) -> RecordId {
        let id = RecordId(Uuid::new_v4());
        self.records.push(IndexRecord {
            id,
            vector: normalize(&embedding),
            segment,
        });
        id
    }
}

/// Cosine similarity in `[-1, 1]`; zero when either vector has no length
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    dot(&normalize(a), &normalize(b))
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(vector: &[f32]) -> Embedding {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}
