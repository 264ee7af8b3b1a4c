#[cfg(test)]
mod tests;

use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;
use crate::{AssistantError, Result};

/// A contiguous slice of a document, the unit that gets embedded and retrieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Path of the document this segment was cut from
    pub source: PathBuf,
    /// Position of this segment within its document
    pub index: usize,
    /// Byte range of the segment in the document text
    pub span: Range<usize>,
    /// Number of leading bytes repeated from the previous segment
    pub overlap: usize,
    /// The segment text, always `&document.text[span]`
    pub text: String,
}

impl Segment {
    /// Segment text without the part carried over from the previous segment
    #[inline]
    pub fn fresh_text(&self) -> &str {
        self.text.get(self.overlap..).unwrap_or_default()
    }

    /// Length in characters, the unit `max_segment_size` is expressed in
    #[inline]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum segment size in characters
    pub max_segment_size: usize,
    /// Characters of the previous segment repeated at the start of the next one
    pub overlap: usize,
    /// Cut words longer than `max_segment_size`; otherwise they are kept whole
    pub split_long_words: bool,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_segment_size: 300,
            overlap: 50,
            split_long_words: false,
        }
    }
}

/// Boundaries tried in order, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Sentence,
    Word,
    Character,
}

impl Boundary {
    const fn finer(self, split_long_words: bool) -> Option<Self> {
        match self {
            Self::Paragraph => Some(Self::Sentence),
            Self::Sentence => Some(Self::Word),
            Self::Word if split_long_words => Some(Self::Character),
            Self::Word | Self::Character => None,
        }
    }

    /// Byte offsets where `text` may be cut. Separators stay attached to the
    /// piece they end, so the pieces always concatenate back to `text`.
    fn cut_points(self, text: &str) -> Vec<usize> {
        match self {
            Self::Paragraph => text
                .match_indices("\n\n")
                .map(|(i, sep)| i + sep.len())
                .filter(|&i| i < text.len())
                .collect(),
            Self::Sentence => cut_after(text, |c| matches!(c, '.' | '!' | '?' | '\n')),
            Self::Word => cut_after(text, char::is_whitespace),
            Self::Character => text
                .char_indices()
                .map(|(i, _)| i)
                .filter(|&i| i > 0)
                .collect(),
        }
    }
}

/// Cut after every char matching `is_end`, keeping any whitespace that
/// follows it with the preceding piece.
fn cut_after(text: &str, is_end: impl Fn(char) -> bool) -> Vec<usize> {
    let mut cuts = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_end(c) {
            continue;
        }
        while let Some(&(_, next)) = chars.peek() {
            if next.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }
        if let Some(&(i, _)) = chars.peek() {
            cuts.push(i);
        }
    }

    cuts
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// A piece produced by the recursive split, with its length in characters
#[derive(Debug, Clone)]
struct Piece {
    span: Range<usize>,
    len: usize,
}

/// Split a document into ordered, overlapping segments.
///
/// Every segment is at most `max_segment_size` characters long unless it
/// consists of a single unsplittable word. Consecutive segments share at most
/// `overlap` characters; dropping each segment's `overlap` prefix and
/// concatenating yields the document text again.
#[inline]
pub fn chunk_document(document: &Document, config: &ChunkingConfig) -> Result<Vec<Segment>> {
    if config.max_segment_size == 0 {
        return Err(AssistantError::Config(
            "max segment size must be greater than zero".to_string(),
        ));
    }
    if config.overlap >= config.max_segment_size {
        return Err(AssistantError::Config(format!(
            "overlap ({}) must be smaller than max segment size ({})",
            config.overlap, config.max_segment_size
        )));
    }

    let text = document.text.as_str();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut pieces = Vec::new();
    split_recursive(text, 0, Boundary::Paragraph, config, &mut pieces);

    let spans = merge_pieces(&pieces, config);

    let mut segments = Vec::with_capacity(spans.len());
    let mut previous_end: usize = 0;
    for (index, span) in spans.into_iter().enumerate() {
        let Some(slice) = text.get(span.clone()) else {
            continue;
        };
        segments.push(Segment {
            source: document.path.clone(),
            index,
            overlap: previous_end.saturating_sub(span.start),
            text: slice.to_string(),
            span: span.clone(),
        });
        previous_end = span.end;
    }

    debug!(
        "Chunked '{}' into {} segments (max {} chars, overlap {})",
        document.path.display(),
        segments.len(),
        config.max_segment_size,
        config.overlap
    );

    Ok(segments)
}

fn split_recursive(
    text: &str,
    offset: usize,
    boundary: Boundary,
    config: &ChunkingConfig,
    out: &mut Vec<Piece>,
) {
    let len = char_len(text);
    if len <= config.max_segment_size {
        out.push(Piece {
            span: offset..offset + text.len(),
            len,
        });
        return;
    }

    let cuts = boundary.cut_points(text);
    if cuts.is_empty() {
        match boundary.finer(config.split_long_words) {
            Some(finer) => split_recursive(text, offset, finer, config, out),
            // A single atomic unit larger than the limit is kept whole
            None => out.push(Piece {
                span: offset..offset + text.len(),
                len,
            }),
        }
        return;
    }

    let mut start = 0;
    for end in cuts.into_iter().chain(std::iter::once(text.len())) {
        if let Some(piece) = text.get(start..end) {
            split_recursive(piece, offset + start, boundary, config, out);
        }
        start = end;
    }
}

/// Greedily pack pieces into segments, carrying the trailing pieces of each
/// segment (up to `overlap` characters) into the next one.
fn merge_pieces(pieces: &[Piece], config: &ChunkingConfig) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut current: Vec<&Piece> = Vec::new();
    let mut total = 0;

    for piece in pieces {
        if total + piece.len > config.max_segment_size && !current.is_empty() {
            if let Some(span) = span_of(&current) {
                spans.push(span);
            }

            let mut dropped = 0;
            while dropped < current.len()
                && (total > config.overlap || total + piece.len > config.max_segment_size)
            {
                total -= current[dropped].len;
                dropped += 1;
            }
            current.drain(..dropped);
        }

        current.push(piece);
        total += piece.len;
    }

    // The last piece pushed is never part of an emitted segment
    if let Some(span) = span_of(&current) {
        spans.push(span);
    }

    spans
}

fn span_of(pieces: &[&Piece]) -> Option<Range<usize>> {
    let first = pieces.first()?;
    let last = pieces.last()?;
    Some(first.span.start..last.span.end)
}
