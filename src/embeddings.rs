//! Chunk records carried from the embedder into vector stores.

use crc32fast::Hasher as Crc32;
use uuid::Uuid;

use crate::chunker::Chunk;

/// Chunk plus its embedding, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunkRecord {
    /// Identifier generated when the record is created.
    pub id: Uuid,
    /// Batch position of the source article.
    pub article_index: usize,
    /// Source identifier of the article.
    pub article_id: String,
    /// Position of the chunk within its article.
    pub chunk_index: usize,
    /// Inclusive character offset into the article.
    pub char_start: usize,
    /// Exclusive character offset into the article.
    pub char_end: usize,
    /// Chunk body submitted to the embedding model.
    pub text: String,
    /// CRC32 of the chunk body.
    pub checksum: u32,
    /// Model embedding vector.
    pub embedding: Vec<f32>,
}

impl EmbeddedChunkRecord {
    /// Pairs a chunk with its embedding under a freshly generated id.
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            article_index: chunk.article_index,
            article_id: chunk.article_id.clone(),
            chunk_index: chunk.chunk_index,
            char_start: chunk.char_start,
            char_end: chunk.char_end,
            text: chunk.text.clone(),
            checksum: checksum(&chunk.text),
            embedding,
        }
    }

    /// Key used when duplicate suppression is requested.
    pub fn dedup_key(&self) -> (&str, usize, usize, u32) {
        (&self.article_id, self.char_start, self.char_end, self.checksum)
    }
}

/// CRC32 checksum of a chunk body.
pub fn checksum(text: &str) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(text.as_bytes());
    hasher.finalize()
}
