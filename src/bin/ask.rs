use anyhow::{bail, Context, Result};
use clap::Parser;
use newsrag::config::{ChatArgs, EmbedderArgs, StoreArgs};
use newsrag::pipeline::render_sources;
use newsrag::{AnswerComposer, GroundedAnswer, VectorStoreAdapter};

#[derive(Parser, Debug)]
#[command(
    name = "newsrag-ask",
    about = "Answer a question from stored news chunks via a local chat model"
)]
struct AskCli {
    /// Question to answer
    #[arg(long)]
    question: String,

    /// Number of chunks retrieved as context
    #[arg(long, env = "NEWSRAG_TOP_K", default_value_t = 2)]
    top_k: usize,

    /// Ask without retrieved context
    #[arg(long, default_value_t = false)]
    no_context: bool,

    /// Only print the retrieved context and the rendered prompt (skip LLM call)
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Print the answer and its sources as JSON
    #[arg(long, default_value_t = false, conflicts_with = "dry_run")]
    json: bool,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    chat: ChatArgs,
}

fn main() -> Result<()> {
    newsrag::logging::init();
    let cli = AskCli::parse();
    let chat = cli.chat.chat_config();
    let composer = AnswerComposer::new(chat.build_provider()?, chat.settings);

    let sources = if cli.no_context {
        Vec::new()
    } else {
        let adapter =
            VectorStoreAdapter::new(cli.embedder.build_embedder()?, cli.store.open(false)?);
        let hits = adapter.query(&cli.question, cli.top_k)?;
        if hits.is_empty() {
            bail!("vector store returned zero chunks; has anything been ingested?");
        }
        if !cli.json {
            println!("--- Retrieved Context ---\n{}", render_sources(&hits));
        }
        hits
    };
    let passages: Option<Vec<String>> = (!cli.no_context)
        .then(|| sources.iter().map(|hit| hit.text.clone()).collect());

    if cli.dry_run {
        let prompt = composer.compose(&cli.question, passages.as_deref());
        println!("--- Prompt ---\n{prompt}\n");
        println!("dry-run enabled; skipping LLM call.");
        return Ok(());
    }

    let answer = composer.answer(&cli.question, passages.as_deref())?;
    if cli.json {
        let grounded = GroundedAnswer { answer, sources };
        let json =
            serde_json::to_string_pretty(&grounded).context("failed to encode answer")?;
        println!("{json}");
        return Ok(());
    }
    println!("--- Answer ---\n{}", answer.trim());
    Ok(())
}
