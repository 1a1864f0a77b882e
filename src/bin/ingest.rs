use anyhow::Result;
use clap::Parser;
use newsrag::config::{ChunkArgs, DatasetArgs, EmbedderArgs, StoreArgs};
use newsrag::pipeline::ingest;
use newsrag::{CorpusLoader, VectorStoreAdapter};

#[derive(Parser, Debug)]
#[command(
    name = "newsrag-ingest",
    about = "Stream news articles, chunk and embed them, and store the chunks in pgvector"
)]
struct IngestCli {
    /// Number of articles to ingest
    #[arg(long, env = "NEWSRAG_ARTICLES", default_value_t = 5)]
    articles: usize,

    #[command(flatten)]
    dataset: DatasetArgs,

    #[command(flatten)]
    chunk: ChunkArgs,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    store: StoreArgs,
}

fn main() -> Result<()> {
    newsrag::logging::init();
    let cli = IngestCli::parse();

    let loader = CorpusLoader::new(cli.dataset.build_source()?);
    let chunker = cli.chunk.build_chunker()?;
    let mut adapter =
        VectorStoreAdapter::new(cli.embedder.build_embedder()?, cli.store.open(false)?)
            .with_write_mode(cli.store.write_mode());

    let report = ingest(&loader, &chunker, &mut adapter, cli.articles)?;
    println!(
        "Ingested {} articles as {} chunks ({} rows written to {}).",
        report.articles,
        report.chunks,
        report.written,
        cli.store.table_name()?.qualified()
    );
    Ok(())
}
