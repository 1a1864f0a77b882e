//! Boundary-aware splitting of articles into bounded, overlapping chunks.
//!
//! Lengths and offsets are counted in Unicode scalar values so a chunk never
//! cuts through a multi-byte character. Chunks tile their article exactly:
//! dropping the first `overlap_chars` characters of every chunk after the
//! first and concatenating the rest reproduces the article text.

use thiserror::Error;
use tracing::debug;

use crate::corpus::Article;

/// Separator classes tried in order before falling back to a hard cut.
const BOUNDARIES: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// Rejected chunker settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkerError {
    /// The maximum chunk length was zero.
    #[error("maximum chunk length must be positive")]
    ZeroLength,
    /// The overlap would stop the window from advancing.
    #[error("overlap of {overlap} characters must be smaller than the maximum chunk length {max}")]
    OverlapTooLarge {
        /// Requested overlap.
        overlap: usize,
        /// Requested maximum chunk length.
        max: usize,
    },
}

/// Chunk sizing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    max_chars: usize,
    overlap_chars: usize,
}

impl ChunkerConfig {
    /// Validates and builds a chunker configuration.
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self, ChunkerError> {
        if max_chars == 0 {
            return Err(ChunkerError::ZeroLength);
        }
        if overlap_chars >= max_chars {
            return Err(ChunkerError::OverlapTooLarge {
                overlap: overlap_chars,
                max: max_chars,
            });
        }
        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }

    /// Upper bound on characters per chunk.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Characters repeated from the tail of the previous chunk.
    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap_chars: 0,
        }
    }
}

/// Contiguous slice of an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Batch position of the owning article.
    pub article_index: usize,
    /// Source identifier of the owning article.
    pub article_id: String,
    /// Position of this chunk within its article.
    pub chunk_index: usize,
    /// Inclusive start offset, in characters.
    pub char_start: usize,
    /// Exclusive end offset, in characters.
    pub char_end: usize,
    /// Chunk body.
    pub text: String,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Stateless splitter applying a fixed [`ChunkerConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Creates a chunker for an already validated configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Splits every article, preserving article order then chunk order.
    pub fn chunk_articles<'a, I>(&self, articles: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = &'a Article>,
    {
        articles
            .into_iter()
            .flat_map(|article| self.chunk_article(article))
            .collect()
    }

    /// Splits a single article.
    pub fn chunk_article(&self, article: &Article) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .split(&article.text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (char_start, char_end, text))| Chunk {
                article_index: article.index,
                article_id: article.id.clone(),
                chunk_index,
                char_start,
                char_end,
                text,
            })
            .collect();
        debug!(
            article = article.index,
            chars = article.text.chars().count(),
            chunks = chunks.len(),
            "chunked article"
        );
        chunks
    }

    /// Splits raw text into `(char_start, char_end, text)` triples.
    pub fn split(&self, text: &str) -> Vec<(usize, usize, String)> {
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();
        split_spans(text, &offsets, self.config.max_chars, self.config.overlap_chars)
            .into_iter()
            .map(|(start, end)| (start, end, text[offsets[start]..offsets[end]].to_string()))
            .collect()
    }
}

fn split_spans(text: &str, offsets: &[usize], max: usize, overlap: usize) -> Vec<(usize, usize)> {
    let total = offsets.len() - 1;
    let mut spans = Vec::new();
    if total == 0 {
        return spans;
    }
    let mut start = 0usize;
    loop {
        if total - start <= max {
            spans.push((start, total));
            return spans;
        }
        let limit = start + max;
        let cut = natural_break(text, offsets, start, limit, start + overlap).unwrap_or(limit);
        spans.push((start, cut));
        start = cut - overlap;
    }
}

/// Latest separator end inside `start..limit` that lands strictly after `floor`.
fn natural_break(
    text: &str,
    offsets: &[usize],
    start: usize,
    limit: usize,
    floor: usize,
) -> Option<usize> {
    let base = offsets[start];
    let window = &text[base..offsets[limit]];
    BOUNDARIES.iter().find_map(|separators| {
        separators
            .iter()
            .filter_map(|sep| window.rfind(sep).map(|pos| base + pos + sep.len()))
            .filter_map(|byte| offsets.binary_search(&byte).ok())
            .filter(|&cut| cut > floor)
            .max()
    })
}
