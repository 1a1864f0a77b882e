//! Command-line and environment configuration shared by the binaries.
//!
//! Each group of flags is a clap `Args` struct that the binaries flatten into
//! their own parser, then convert into the plain config types the library
//! stages take.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use crate::chunker::{Chunker, ChunkerConfig};
use crate::composer::ChatSettings;
use crate::corpus::{DatasetConfig, HfDatasetSource};
use crate::embedder::{EmbedderConfig, OpenAiEmbedder};
use crate::providers::{ChatBackend, LlmProvider, OllamaProvider, OpenAiProvider};
use crate::vector_store::{
    DistanceMetric, MemoryVectorStore, PgVectorStore, TableName, VectorStore, WriteMode,
};

/// Where articles are streamed from.
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Base URL of the datasets-server rows API
    #[arg(
        long,
        env = "NEWSRAG_DATASET_URL",
        default_value = "https://datasets-server.huggingface.co"
    )]
    pub dataset_url: String,

    /// Dataset repository id
    #[arg(long, env = "NEWSRAG_DATASET", default_value = "abisee/cnn_dailymail")]
    pub dataset: String,

    /// Dataset configuration name
    #[arg(long, env = "NEWSRAG_DATASET_CONFIG", default_value = "3.0.0")]
    pub dataset_config: String,

    /// Dataset split
    #[arg(long, env = "NEWSRAG_SPLIT", default_value = "train")]
    pub split: String,

    /// Column holding the article body
    #[arg(long, env = "NEWSRAG_TEXT_FIELD", default_value = "article")]
    pub text_field: String,

    /// Rows requested per page (capped at 100 by the server)
    #[arg(long, env = "NEWSRAG_PAGE_SIZE", default_value_t = 100)]
    pub page_size: usize,

    /// Optional Hugging Face token for gated datasets
    #[arg(long, env = "HF_TOKEN")]
    pub hf_token: Option<String>,

    /// HTTP timeout for dataset requests, in seconds
    #[arg(long, env = "NEWSRAG_DATASET_TIMEOUT_SECS", default_value_t = 30)]
    pub dataset_timeout_secs: u64,
}

impl DatasetArgs {
    /// Dataset settings described by these flags.
    pub fn dataset_config(&self) -> DatasetConfig {
        DatasetConfig {
            base_url: self.dataset_url.clone(),
            dataset: self.dataset.clone(),
            config: self.dataset_config.clone(),
            split: self.split.clone(),
            text_field: self.text_field.clone(),
            token: self.hf_token.clone().filter(|token| !token.trim().is_empty()),
            page_size: self.page_size,
            timeout: Duration::from_secs(self.dataset_timeout_secs),
            ..DatasetConfig::default()
        }
    }

    /// Builds the HTTP article source.
    pub fn build_source(&self) -> Result<HfDatasetSource> {
        HfDatasetSource::new(self.dataset_config())
    }
}

/// Chunk sizing.
#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    /// Maximum chunk length, in characters
    #[arg(long, env = "NEWSRAG_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, env = "NEWSRAG_CHUNK_OVERLAP", default_value_t = 0)]
    pub chunk_overlap: usize,
}

impl ChunkArgs {
    /// Validates the sizes and builds a chunker.
    pub fn build_chunker(&self) -> Result<Chunker> {
        let config = ChunkerConfig::new(self.chunk_size, self.chunk_overlap)
            .context("invalid chunk settings")?;
        Ok(Chunker::new(config))
    }
}

/// Embedding endpoint.
#[derive(Args, Debug, Clone)]
pub struct EmbedderArgs {
    /// Base URL of an OpenAI-compatible embeddings API
    #[arg(
        long,
        env = "NEWSRAG_EMBED_URL",
        default_value = "http://localhost:11434/v1"
    )]
    pub embed_url: String,

    /// Embedding model
    #[arg(long, env = "NEWSRAG_EMBED_MODEL", default_value = "nomic-embed-text")]
    pub embed_model: String,

    /// Bearer token for the embeddings API
    #[arg(long, env = "NEWSRAG_EMBED_API_KEY")]
    pub embed_api_key: Option<String>,

    /// Requested embedding dimensions, for models that support truncation
    #[arg(long, env = "NEWSRAG_EMBED_DIMENSIONS")]
    pub embed_dimensions: Option<usize>,

    /// Inputs sent per embeddings request
    #[arg(long, env = "NEWSRAG_EMBED_BATCH", default_value_t = 32)]
    pub embed_batch: usize,

    /// HTTP timeout for embedding requests, in seconds
    #[arg(long, env = "NEWSRAG_EMBED_TIMEOUT_SECS", default_value_t = 30)]
    pub embed_timeout_secs: u64,
}

impl EmbedderArgs {
    /// Embedder settings described by these flags.
    pub fn embedder_config(&self) -> EmbedderConfig {
        EmbedderConfig {
            base_url: self.embed_url.clone(),
            model: self.embed_model.clone(),
            api_key: self.embed_api_key.clone(),
            dimensions: self.embed_dimensions,
            timeout: Duration::from_secs(self.embed_timeout_secs),
            batch_size: self.embed_batch,
        }
    }

    /// Builds the embeddings client.
    pub fn build_embedder(&self) -> Result<OpenAiEmbedder> {
        OpenAiEmbedder::new(self.embedder_config())
    }
}

/// Vector store location and behavior.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Postgres connection string (pgvector must be installable)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Schema holding the chunk table
    #[arg(long, env = "NEWSRAG_SCHEMA", default_value = "public")]
    pub schema: String,

    /// Chunk table name
    #[arg(long, env = "NEWSRAG_TABLE", default_value = "news_chunks")]
    pub table: String,

    /// Distance used for nearest-neighbor ordering
    #[arg(long, env = "NEWSRAG_METRIC", value_enum, default_value_t = DistanceMetric::Cosine)]
    pub metric: DistanceMetric,

    /// Skip chunks already stored with the same article, span and checksum
    #[arg(long, env = "NEWSRAG_SKIP_DUPLICATES", default_value_t = false)]
    pub skip_duplicates: bool,
}

impl StoreArgs {
    /// Write mode selected by `--skip-duplicates`.
    pub fn write_mode(&self) -> WriteMode {
        if self.skip_duplicates {
            WriteMode::SkipDuplicates
        } else {
            WriteMode::Append
        }
    }

    /// Validated table name.
    pub fn table_name(&self) -> Result<TableName> {
        TableName::new(&self.schema, &self.table)
    }

    /// Connects to Postgres, or falls back to an in-process store when no
    /// database URL is configured and `allow_memory` is set.
    pub fn open(&self, allow_memory: bool) -> Result<Box<dyn VectorStore>> {
        match self.database_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => {
                let store = PgVectorStore::connect(url, self.table_name()?, self.metric)?;
                Ok(Box::new(store))
            }
            None if allow_memory => {
                warn!("DATABASE_URL not set; using an in-memory vector store for this run");
                Ok(Box::new(MemoryVectorStore::new(self.metric)))
            }
            None => anyhow::bail!("DATABASE_URL must be set to use the pgvector store"),
        }
    }
}

/// Chat backend selection plus the settings sent with each request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Which wire protocol to speak.
    pub backend: ChatBackend,
    /// Server base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer token for OpenAI-compatible servers.
    pub api_key: Option<String>,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Sampling and sizing settings.
    pub settings: ChatSettings,
}

impl ChatConfig {
    /// Builds the provider for the selected backend.
    pub fn build_provider(&self) -> Result<Box<dyn LlmProvider>> {
        let provider: Box<dyn LlmProvider> = match self.backend {
            ChatBackend::Ollama => Box::new(OllamaProvider::new(
                &self.base_url,
                self.model.clone(),
                self.timeout,
            )?),
            ChatBackend::Openai => Box::new(OpenAiProvider::new(
                &self.base_url,
                self.api_key.clone(),
                self.model.clone(),
                self.timeout,
            )?),
        };
        Ok(provider)
    }
}

/// Chat model flags.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Chat protocol spoken by the model server
    #[arg(long, env = "NEWSRAG_CHAT_BACKEND", value_enum, default_value_t = ChatBackend::Ollama)]
    pub chat_backend: ChatBackend,

    /// Base URL of the chat server (append /v1 for OpenAI-compatible servers)
    #[arg(
        long,
        env = "NEWSRAG_CHAT_URL",
        default_value = "http://localhost:11434"
    )]
    pub chat_url: String,

    /// Chat model
    #[arg(long, env = "NEWSRAG_CHAT_MODEL", default_value = "llama3")]
    pub chat_model: String,

    /// Bearer token for OpenAI-compatible chat servers
    #[arg(long, env = "NEWSRAG_CHAT_API_KEY")]
    pub chat_api_key: Option<String>,

    /// Context window requested from the model server, in tokens (Ollama only;
    /// OpenAI-compatible servers use their own setting)
    #[arg(long, env = "NEWSRAG_CONTEXT_WINDOW", default_value_t = 4096)]
    pub context_window: usize,

    /// Sampling temperature
    #[arg(long, env = "NEWSRAG_TEMPERATURE", default_value_t = 0.0)]
    pub temperature: f32,

    /// Maximum tokens to request from the completion model
    #[arg(long, env = "NEWSRAG_MAX_TOKENS", default_value_t = 512)]
    pub max_tokens: usize,

    /// HTTP timeout for chat requests, in seconds
    #[arg(long, env = "NEWSRAG_CHAT_TIMEOUT_SECS", default_value_t = 120)]
    pub chat_timeout_secs: u64,
}

impl ChatArgs {
    /// Chat settings described by these flags.
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            backend: self.chat_backend,
            base_url: self.chat_url.clone(),
            model: self.chat_model.clone(),
            api_key: self.chat_api_key.clone(),
            timeout: Duration::from_secs(self.chat_timeout_secs),
            settings: ChatSettings {
                context_window: self.context_window,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
        }
    }
}
