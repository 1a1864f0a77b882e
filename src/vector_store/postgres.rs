//! Postgres + pgvector backend.
//!
//! `tokio-postgres` is driven from a private current-thread runtime so that
//! callers see the same blocking API as every other stage.

use anyhow::{anyhow, Context, Result};
use pgvector::Vector;
use tokio::runtime::Runtime;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{DistanceMetric, RetrievedChunk, TableName, VectorStore, WriteMode};
use crate::embeddings::EmbeddedChunkRecord;

/// Vector store backed by a single Postgres connection.
pub struct PgVectorStore {
    runtime: Runtime,
    client: Client,
    table: TableName,
    metric: DistanceMetric,
    dedup_index_ready: bool,
}

impl PgVectorStore {
    /// Opens the connection used for the rest of the session.
    pub fn connect(database_url: &str, table: TableName, metric: DistanceMetric) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build Postgres runtime")?;
        let (client, connection) = runtime
            .block_on(tokio_postgres::connect(database_url, NoTls))
            .context("failed to connect to Postgres")?;
        runtime.spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "postgres connection error");
            }
        });
        info!(table = %table.qualified(), ?metric, "connected to pgvector store");
        Ok(Self {
            runtime,
            client,
            table,
            metric,
            dedup_index_ready: false,
        })
    }

    /// Target table.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    fn ensure_dedup_index(&mut self) -> Result<()> {
        if self.dedup_index_ready {
            return Ok(());
        }
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} (article_id, char_start, char_end, checksum)",
            self.table.dedup_index_name(),
            self.table.qualified()
        );
        self.runtime
            .block_on(self.client.batch_execute(&sql))
            .context("failed to ensure duplicate-suppression index")?;
        self.dedup_index_ready = true;
        Ok(())
    }
}

impl VectorStore for PgVectorStore {
    fn ensure_namespace(&mut self, dimensions: usize) -> Result<()> {
        anyhow::ensure!(dimensions > 0, "embedding dimension must be positive");
        let statements = [
            ("CREATE EXTENSION IF NOT EXISTS vector".to_string(), "pgvector extension"),
            (
                format!("CREATE SCHEMA IF NOT EXISTS {}", self.table.quoted_schema()),
                "schema",
            ),
            (create_table_sql(&self.table, dimensions), "vector table"),
        ];
        for (sql, what) in statements {
            self.runtime
                .block_on(self.client.batch_execute(&sql))
                .with_context(|| format!("failed to ensure {what}"))?;
        }
        debug!(table = %self.table.qualified(), dimensions, "namespace ready");
        Ok(())
    }

    fn insert(&mut self, records: &[EmbeddedChunkRecord], mode: WriteMode) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        if mode == WriteMode::SkipDuplicates {
            self.ensure_dedup_index()?;
        }
        let sql = insert_sql(&self.table, mode);
        let Self {
            runtime, client, ..
        } = self;
        let written = runtime.block_on(insert_batch(client, &sql, records))?;
        debug!(written, batch = records.len(), "inserted records");
        Ok(written)
    }

    fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let sql = select_sql(&self.table, self.metric);
        let vector = Vector::from(embedding.to_vec());
        let limit = as_i64(k, "k")?;
        let rows = self
            .runtime
            .block_on(self.client.query(sql.as_str(), &[&vector, &limit]))
            .with_context(|| format!("nearest-neighbor query on {} failed", self.table.qualified()))?;
        rows.iter().map(chunk_from_row).collect()
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

async fn insert_batch(
    client: &mut Client,
    sql: &str,
    records: &[EmbeddedChunkRecord],
) -> Result<usize> {
    let transaction = client.transaction().await?;
    let statement = transaction.prepare(sql).await?;
    let mut written = 0u64;
    for record in records {
        let vector = Vector::from(record.embedding.clone());
        let article_index = as_i64(record.article_index, "article_index")?;
        let chunk_index = as_i64(record.chunk_index, "chunk_index")?;
        let char_start = as_i64(record.char_start, "char_start")?;
        let char_end = as_i64(record.char_end, "char_end")?;
        let checksum = i64::from(record.checksum);
        written += transaction
            .execute(
                &statement,
                &[
                    &record.id,
                    &article_index,
                    &record.article_id,
                    &chunk_index,
                    &char_start,
                    &char_end,
                    &record.text,
                    &checksum,
                    &vector,
                ],
            )
            .await
            .with_context(|| {
                format!(
                    "failed to insert chunk {} of article {}",
                    record.chunk_index, record.article_id
                )
            })?;
    }
    transaction.commit().await?;
    usize::try_from(written).map_err(|_| anyhow!("row count {written} exceeds usize"))
}

fn create_table_sql(table: &TableName, dims: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY,
            article_index BIGINT NOT NULL,
            article_id TEXT NOT NULL,
            chunk_index BIGINT NOT NULL,
            char_start BIGINT NOT NULL,
            char_end BIGINT NOT NULL,
            text TEXT NOT NULL,
            checksum BIGINT NOT NULL,
            embedding VECTOR({dims}) NOT NULL
        )",
        table.qualified()
    )
}

fn insert_sql(table: &TableName, mode: WriteMode) -> String {
    let mut sql = format!(
        "INSERT INTO {} \
            (id, article_index, article_id, chunk_index, char_start, char_end, text, checksum, embedding) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        table.qualified()
    );
    if mode == WriteMode::SkipDuplicates {
        sql.push_str(" ON CONFLICT (article_id, char_start, char_end, checksum) DO NOTHING");
    }
    sql
}

fn select_sql(table: &TableName, metric: DistanceMetric) -> String {
    let op = metric.operator();
    format!(
        "SELECT \
            id, \
            article_index, \
            article_id, \
            chunk_index, \
            char_start, \
            char_end, \
            text, \
            embedding {op} $1 AS distance \
        FROM {} \
        ORDER BY embedding {op} $1 ASC \
        LIMIT $2",
        table.qualified()
    )
}

fn chunk_from_row(row: &Row) -> Result<RetrievedChunk> {
    let id: Uuid = row.get("id");
    let article_index: i64 = row.get("article_index");
    let chunk_index: i64 = row.get("chunk_index");
    let char_start: i64 = row.get("char_start");
    let char_end: i64 = row.get("char_end");
    Ok(RetrievedChunk {
        id,
        article_index: as_usize(article_index, "article_index")?,
        article_id: row.get("article_id"),
        chunk_index: as_usize(chunk_index, "chunk_index")?,
        char_start: as_usize(char_start, "char_start")?,
        char_end: as_usize(char_end, "char_end")?,
        text: row.get("text"),
        distance: row.get("distance"),
    })
}

fn as_i64<T>(value: T, field: &str) -> Result<i64>
where
    i64: TryFrom<T>,
    T: Copy + std::fmt::Display,
{
    i64::try_from(value).map_err(|_| anyhow!("{} value {} exceeds i64 range", field, value))
}

fn as_usize(value: i64, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| anyhow!("{} value {} is not a valid offset", field, value))
}
