use anyhow::{Context, Result};
use clap::Parser;
use newsrag::config::{ChatArgs, ChunkArgs, DatasetArgs, EmbedderArgs, StoreArgs};
use newsrag::pipeline::render_sources;
use newsrag::{
    AnswerComposer, Comparison, CorpusLoader, IngestReport, Pipeline, VectorStoreAdapter,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "newsrag-demo",
    about = "Ingest a few news articles, then answer a question with and without retrieved context"
)]
struct DemoCli {
    /// Question asked twice: once bare, once grounded on retrieved chunks
    #[arg(
        long,
        env = "NEWSRAG_QUESTION",
        default_value = "What kind of fortune does Daniel Radcliffe get when he turns 18?"
    )]
    question: String,

    /// Number of articles to ingest
    #[arg(long, env = "NEWSRAG_ARTICLES", default_value_t = 5)]
    articles: usize,

    /// Number of chunks retrieved for the grounded answer
    #[arg(long, env = "NEWSRAG_TOP_K", default_value_t = 2)]
    top_k: usize,

    /// Reuse what is already stored instead of ingesting first
    #[arg(long, default_value_t = false)]
    skip_ingest: bool,

    /// Print one JSON document instead of the text report
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(flatten)]
    dataset: DatasetArgs,

    #[command(flatten)]
    chunk: ChunkArgs,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    chat: ChatArgs,
}

fn main() -> Result<()> {
    newsrag::logging::init();
    let cli = DemoCli::parse();

    let loader = CorpusLoader::new(cli.dataset.build_source()?);
    let chunker = cli.chunk.build_chunker()?;
    let adapter = VectorStoreAdapter::new(cli.embedder.build_embedder()?, cli.store.open(true)?)
        .with_write_mode(cli.store.write_mode());
    let chat = cli.chat.chat_config();
    let composer = AnswerComposer::new(chat.build_provider()?, chat.settings);
    let mut pipeline = Pipeline::new(loader, chunker, adapter, composer);

    let ingest = if cli.skip_ingest {
        None
    } else {
        Some(pipeline.ingest(cli.articles)?)
    };
    let comparison = pipeline.compare(&cli.question, cli.top_k)?;

    if cli.json {
        let output = DemoOutput {
            question: cli.question.trim(),
            ingest,
            comparison: &comparison,
        };
        let json = serde_json::to_string_pretty(&output).context("failed to encode demo output")?;
        println!("{json}");
        return Ok(());
    }

    if let Some(report) = ingest {
        println!(
            "Ingested {} articles as {} chunks ({} rows written).\n",
            report.articles, report.chunks, report.written
        );
    }
    println!("--- Question ---\n{}\n", cli.question.trim());
    println!(
        "--- Retrieved Context ---\n{}",
        render_sources(&comparison.grounded.sources)
    );
    println!("--- Answer without context ---\n{}\n", comparison.baseline.trim());
    println!(
        "--- Answer with context ---\n{}",
        comparison.grounded.answer.trim()
    );
    Ok(())
}

#[derive(Serialize)]
struct DemoOutput<'a> {
    question: &'a str,
    ingest: Option<IngestReport>,
    comparison: &'a Comparison,
}
