#![warn(missing_docs)]
//! Retrieval-augmented question answering over CNN/DailyMail news articles.
//!
//! Articles are streamed from the Hugging Face datasets-server, split into
//! overlapping chunks, embedded and stored in pgvector. Questions are answered
//! by a local chat model, either on their own or grounded on the nearest
//! stored chunks.

pub mod chunker;
pub mod composer;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod embeddings;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod retrieval;
pub mod vector_store;

pub use chunker::{Chunk, Chunker, ChunkerConfig, ChunkerError};
pub use composer::{AnswerComposer, ChatSettings};
pub use corpus::{Article, ArticleSource, CorpusLoader, DatasetConfig, HfDatasetSource};
pub use embedder::{Embedder, EmbedderConfig, OpenAiEmbedder};
pub use embeddings::EmbeddedChunkRecord;
pub use pipeline::{Comparison, GroundedAnswer, IngestReport, Pipeline};
pub use prompt::PromptTemplate;
pub use providers::{ChatBackend, LlmProvider, OllamaProvider, OpenAiProvider, ProviderRequest};
pub use retrieval::VectorStoreAdapter;
pub use vector_store::{
    DistanceMetric, MemoryVectorStore, PgVectorStore, RetrievedChunk, TableName, VectorStore,
    WriteMode,
};
