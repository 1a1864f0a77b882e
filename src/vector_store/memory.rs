//! Brute-force in-process vector store.

use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use super::{DistanceMetric, RetrievedChunk, VectorStore, WriteMode};
use crate::embeddings::EmbeddedChunkRecord;

/// Keeps records in insertion order and scans all of them per query.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    metric: DistanceMetric,
    dimensions: Option<usize>,
    records: Vec<EmbeddedChunkRecord>,
}

impl MemoryVectorStore {
    /// Creates an empty store ordering results by `metric`.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            dimensions: None,
            records: Vec::new(),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stored records in insertion order.
    pub fn records(&self) -> &[EmbeddedChunkRecord] {
        &self.records
    }
}

impl VectorStore for MemoryVectorStore {
    fn ensure_namespace(&mut self, dimensions: usize) -> Result<()> {
        anyhow::ensure!(dimensions > 0, "embedding dimension must be positive");
        match self.dimensions {
            Some(existing) => anyhow::ensure!(
                existing == dimensions,
                "namespace holds {existing}-dimensional vectors, got {dimensions}"
            ),
            None => self.dimensions = Some(dimensions),
        }
        Ok(())
    }

    fn insert(&mut self, records: &[EmbeddedChunkRecord], mode: WriteMode) -> Result<usize> {
        let Some(dims) = self.dimensions else {
            anyhow::bail!("namespace has not been created");
        };
        let mut seen: HashSet<(String, usize, usize, u32)> = match mode {
            WriteMode::Append => HashSet::new(),
            WriteMode::SkipDuplicates => self.records.iter().map(owned_key).collect(),
        };
        // validate the whole batch first so a failed insert stores nothing
        if let Some(bad) = records.iter().find(|record| record.embedding.len() != dims) {
            anyhow::bail!(
                "record {} has {} dimensions, expected {}",
                bad.id,
                bad.embedding.len(),
                dims
            );
        }
        let accepted: Vec<EmbeddedChunkRecord> = records
            .iter()
            .filter(|record| mode == WriteMode::Append || seen.insert(owned_key(record)))
            .cloned()
            .collect();
        let written = accepted.len();
        self.records.extend(accepted);
        debug!(written, total = self.records.len(), "stored records in memory");
        Ok(written)
    }

    fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(dims) = self.dimensions {
            anyhow::ensure!(
                embedding.len() == dims,
                "query has {} dimensions, expected {}",
                embedding.len(),
                dims
            );
        }
        let mut scored: Vec<(usize, f64)> = self
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let distance = self.metric.distance(embedding, &record.embedding);
                (idx, if distance.is_nan() { f64::INFINITY } else { distance })
            })
            .collect();
        // stable sort keeps insertion order among ties; NaN distances sort last
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(idx, distance)| RetrievedChunk::from_record(&self.records[idx], distance))
            .collect())
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

fn owned_key(record: &EmbeddedChunkRecord) -> (String, usize, usize, u32) {
    let (article_id, start, end, checksum) = record.dedup_key();
    (article_id.to_string(), start, end, checksum)
}
