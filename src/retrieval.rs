//! Vector store adapter: embeds chunks on the way in and queries on the way out.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::chunker::Chunk;
use crate::embedder::Embedder;
use crate::embeddings::EmbeddedChunkRecord;
use crate::vector_store::{RetrievedChunk, VectorStore, WriteMode};

/// Couples an embedder with a vector store.
pub struct VectorStoreAdapter<E, S> {
    embedder: E,
    store: S,
    mode: WriteMode,
    namespace_ready: bool,
}

impl<E: Embedder, S: VectorStore> VectorStoreAdapter<E, S> {
    /// Builds an adapter that appends on every write.
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder,
            store,
            mode: WriteMode::Append,
            namespace_ready: false,
        }
    }

    /// Switches the write mode.
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Embeds and stores every chunk, returning the number of rows written.
    ///
    /// The namespace is created on the first batch, sized from its embeddings.
    pub fn write(&mut self, chunks: &[Chunk]) -> Result<usize> {
        let batch_size = self.embedder.batch_size().max(1);
        let mut written = 0usize;
        for batch in chunks.chunks(batch_size) {
            let inputs: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
            let embeddings = self
                .embedder
                .embed_batch(&inputs)
                .context("failed to embed chunks")?;
            anyhow::ensure!(
                embeddings.len() == batch.len(),
                "embedding count {} mismatched batch {}",
                embeddings.len(),
                batch.len()
            );
            if !self.namespace_ready {
                let dims = embeddings.first().map(Vec::len).unwrap_or_default();
                self.store.ensure_namespace(dims)?;
                self.namespace_ready = true;
            }
            let records: Vec<EmbeddedChunkRecord> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| EmbeddedChunkRecord::from_chunk(chunk, embedding))
                .collect();
            written += self.store.insert(&records, self.mode)?;
            debug!(batch = batch.len(), written, "stored embedding batch");
        }
        info!(chunks = chunks.len(), written, "wrote chunks to vector store");
        Ok(written)
    }

    /// Returns the `k` stored chunks nearest to `text`, closest first.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        anyhow::ensure!(!text.trim().is_empty(), "query text must not be empty");
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self
            .embedder
            .embed_one(text)
            .context("failed to embed query")?;
        let hits = self.store.nearest(&embedding, k)?;
        info!(
            k,
            returned = hits.len(),
            best = ?hits.first().map(|hit| hit.distance),
            metric = ?self.store.metric(),
            "retrieved chunks"
        );
        Ok(hits)
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Underlying embedder.
    pub fn embedder(&self) -> &E {
        &self.embedder
    }
}
