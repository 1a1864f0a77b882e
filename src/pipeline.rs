//! Loader → chunker → vector store → composer, as plain ordered calls.

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::chunker::Chunker;
use crate::composer::AnswerComposer;
use crate::corpus::{ArticleSource, CorpusLoader};
use crate::embedder::Embedder;
use crate::providers::LlmProvider;
use crate::retrieval::VectorStoreAdapter;
use crate::vector_store::{RetrievedChunk, VectorStore};

/// Counts reported by [`Pipeline::ingest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Articles pulled from the source.
    pub articles: usize,
    /// Chunks produced from those articles.
    pub chunks: usize,
    /// Rows the store reported as written.
    pub written: usize,
}

/// Completion produced with retrieved context, plus the context itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundedAnswer {
    /// Raw model completion.
    pub answer: String,
    /// Chunks interpolated into the prompt, closest first.
    pub sources: Vec<RetrievedChunk>,
}

/// Baseline and grounded completions for the same question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Completion without any retrieved context.
    pub baseline: String,
    /// Completion grounded on retrieved chunks.
    pub grounded: GroundedAnswer,
}

/// Write path on its own: stream, chunk and store `articles` articles.
pub fn ingest<S, E, V>(
    loader: &CorpusLoader<S>,
    chunker: &Chunker,
    adapter: &mut VectorStoreAdapter<E, V>,
    articles: usize,
) -> Result<IngestReport>
where
    S: ArticleSource,
    E: Embedder,
    V: VectorStore,
{
    let mut report = IngestReport::default();
    for article in loader.stream(articles) {
        let article = article?;
        let chunks = chunker.chunk_article(&article);
        report.articles += 1;
        report.chunks += chunks.len();
        report.written += adapter.write(&chunks)?;
    }
    info!(
        articles = report.articles,
        chunks = report.chunks,
        written = report.written,
        "ingest finished"
    );
    Ok(report)
}

/// Human-readable listing of retrieved chunks.
pub fn render_sources(sources: &[RetrievedChunk]) -> String {
    let mut out = String::new();
    for (rank, hit) in sources.iter().enumerate() {
        out.push_str(&format!(
            "#{} | article {} ({}) chunk {} [{}..{}] | distance {:.4}\n{}\n---\n",
            rank + 1,
            hit.article_index,
            hit.article_id,
            hit.chunk_index,
            hit.char_start,
            hit.char_end,
            hit.distance,
            hit.text.trim()
        ));
    }
    out
}

/// The four stages, each holding the collaborator handles it was built with.
pub struct Pipeline<S, E, V, P> {
    loader: CorpusLoader<S>,
    chunker: Chunker,
    adapter: VectorStoreAdapter<E, V>,
    composer: AnswerComposer<P>,
}

impl<S, E, V, P> Pipeline<S, E, V, P>
where
    S: ArticleSource,
    E: Embedder,
    V: VectorStore,
    P: LlmProvider,
{
    /// Assembles a pipeline from its stages.
    pub fn new(
        loader: CorpusLoader<S>,
        chunker: Chunker,
        adapter: VectorStoreAdapter<E, V>,
        composer: AnswerComposer<P>,
    ) -> Self {
        Self {
            loader,
            chunker,
            adapter,
            composer,
        }
    }

    /// Streams `articles` articles, chunks each one and writes its chunks.
    pub fn ingest(&mut self, articles: usize) -> Result<IngestReport> {
        ingest(&self.loader, &self.chunker, &mut self.adapter, articles)
    }

    /// Nearest `k` chunks for `question`.
    pub fn retrieve(&self, question: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        self.adapter.query(question, k)
    }

    /// Asks the model with no retrieved context.
    pub fn answer_without_context(&self, question: &str) -> Result<String> {
        self.composer.answer(question, None)
    }

    /// Retrieves `k` chunks and asks the model with them as context.
    pub fn answer(&self, question: &str, k: usize) -> Result<GroundedAnswer> {
        let sources = self.retrieve(question, k)?;
        let passages: Vec<String> = sources.iter().map(|hit| hit.text.clone()).collect();
        let answer = self.composer.answer(question, Some(passages.as_slice()))?;
        Ok(GroundedAnswer { answer, sources })
    }

    /// Runs the baseline call and then the grounded call.
    pub fn compare(&self, question: &str, k: usize) -> Result<Comparison> {
        let baseline = self.answer_without_context(question)?;
        let grounded = self.answer(question, k)?;
        Ok(Comparison { baseline, grounded })
    }

    /// Vector store adapter stage.
    pub fn adapter(&self) -> &VectorStoreAdapter<E, V> {
        &self.adapter
    }

    /// Answer composer stage.
    pub fn composer(&self) -> &AnswerComposer<P> {
        &self.composer
    }

    /// Corpus loader stage.
    pub fn loader(&self) -> &CorpusLoader<S> {
        &self.loader
    }
}
