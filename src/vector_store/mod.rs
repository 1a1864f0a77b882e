//! Vector store abstraction plus the pgvector and in-memory backends.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use uuid::Uuid;

use crate::embeddings::EmbeddedChunkRecord;

pub mod memory;
pub mod postgres;

pub use memory::MemoryVectorStore;
pub use postgres::PgVectorStore;

/// Fully-qualified Postgres table name (schema + table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Builds a new table identifier.
    pub fn new<S, T>(schema: S, table: T) -> Result<Self>
    where
        S: Into<String>,
        T: Into<String>,
    {
        let schema = schema.into();
        let table = table.into();
        anyhow::ensure!(!schema.trim().is_empty(), "schema name is required");
        anyhow::ensure!(!table.trim().is_empty(), "table name is required");
        Ok(Self { schema, table })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    /// Quoted schema identifier.
    pub fn quoted_schema(&self) -> String {
        quote_ident(&self.schema)
    }

    /// Returns the raw schema string.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the raw table string.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name of the unique index backing duplicate suppression.
    pub fn dedup_index_name(&self) -> String {
        format!(
            "{}_{}_dedup_idx",
            sanitize_ident(&self.schema),
            sanitize_ident(&self.table)
        )
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

fn sanitize_ident(input: &str) -> String {
    input
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

/// Distance function used for nearest-neighbor ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`.
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
    /// Negated inner product, so smaller still means closer.
    InnerProduct,
}

impl DistanceMetric {
    /// pgvector operator implementing this metric.
    pub fn operator(self) -> &'static str {
        match self {
            Self::Cosine => "<=>",
            Self::L2 => "<->",
            Self::InnerProduct => "<#>",
        }
    }

    /// Computes the distance between two equal-length vectors.
    ///
    /// Cosine distance against a zero vector is reported as `1.0`.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
        match self {
            Self::Cosine => {
                let norm_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
                let norm_b = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (norm_a * norm_b)
                }
            }
            Self::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (*x as f64 - *y as f64).powi(2))
                .sum::<f64>()
                .sqrt(),
            Self::InnerProduct => -dot,
        }
    }
}

/// How inserts treat records that were already written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Insert every record; repeated writes create duplicates.
    #[default]
    Append,
    /// Skip records whose (article id, span, checksum) already exists.
    SkipDuplicates,
}

/// Stored chunk returned by a nearest-neighbor query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    /// Record identifier.
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
    /// Chunk body.
    pub text: String,
    /// Distance to the query under the store's metric.
    pub distance: f64,
}

impl RetrievedChunk {
    pub(crate) fn from_record(record: &EmbeddedChunkRecord, distance: f64) -> Self {
        Self {
            id: record.id,
            article_index: record.article_index,
            article_id: record.article_id.clone(),
            chunk_index: record.chunk_index,
            char_start: record.char_start,
            char_end: record.char_end,
            text: record.text.clone(),
            distance,
        }
    }
}

/// Persistent home for embedded chunks.
pub trait VectorStore {
    /// Creates the namespace for vectors of `dimensions` length if absent.
    fn ensure_namespace(&mut self, dimensions: usize) -> Result<()>;

    /// Persists records, returning how many rows were written.
    fn insert(&mut self, records: &[EmbeddedChunkRecord], mode: WriteMode) -> Result<usize>;

    /// Returns up to `k` records ordered by ascending distance to `embedding`.
    ///
    /// Ties keep the backend's native order.
    fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Metric used for ordering.
    fn metric(&self) -> DistanceMetric;
}

impl<V: VectorStore + ?Sized> VectorStore for Box<V> {
    fn ensure_namespace(&mut self, dimensions: usize) -> Result<()> {
        (**self).ensure_namespace(dimensions)
    }

    fn insert(&mut self, records: &[EmbeddedChunkRecord], mode: WriteMode) -> Result<usize> {
        (**self).insert(records, mode)
    }

    fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        (**self).nearest(embedding, k)
    }

    fn metric(&self) -> DistanceMetric {
        (**self).metric()
    }
}
