mod common;

use common::{FixtureSource, HashingEmbedder, RecordingProvider, QUESTION, RADCLIFFE};
use newsrag::pipeline::ingest;
use newsrag::prompt::CONTEXT_HEADER;
use newsrag::{
    AnswerComposer, ChatSettings, Chunker, ChunkerConfig, CorpusLoader, DistanceMetric,
    MemoryVectorStore, Pipeline, VectorStoreAdapter, WriteMode,
};

type TestPipeline = Pipeline<FixtureSource, HashingEmbedder, MemoryVectorStore, RecordingProvider>;

fn pipeline(max_chars: usize, overlap: usize, mode: WriteMode) -> TestPipeline {
    let loader = CorpusLoader::new(FixtureSource::news());
    let chunker = Chunker::new(ChunkerConfig::new(max_chars, overlap).unwrap());
    let adapter = VectorStoreAdapter::new(
        HashingEmbedder::default(),
        MemoryVectorStore::new(DistanceMetric::Cosine),
    )
    .with_write_mode(mode);
    let composer = AnswerComposer::new(RecordingProvider::default(), ChatSettings::default());
    Pipeline::new(loader, chunker, adapter, composer)
}

#[test]
fn radcliffe_scenario_retrieves_the_fortune_chunk() {
    let mut pipeline = pipeline(1000, 0, WriteMode::Append);
    let report = pipeline.ingest(5).unwrap();
    assert_eq!(report.articles, 5);
    assert_eq!(report.chunks, 5);
    assert_eq!(report.written, 5);

    let hits = pipeline.retrieve(QUESTION, 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].text.contains("£20 million"));
    assert_eq!(hits[0].article_id, "fixture-0");
    assert_eq!(hits[0].text, RADCLIFFE);
    assert!(hits[0].distance <= hits[1].distance);
}

#[test]
fn grounded_answer_uses_context_and_baseline_does_not() {
    let mut pipeline = pipeline(1000, 0, WriteMode::Append);
    pipeline.ingest(5).unwrap();

    let comparison = pipeline.compare(QUESTION, 2).unwrap();
    assert!(!comparison.baseline.contains("£20 million"));
    assert!(comparison.grounded.answer.contains("£20 million"));
    assert_eq!(comparison.grounded.sources.len(), 2);

    let prompts = pipeline.composer().provider().prompts.borrow();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains(CONTEXT_HEADER));
    assert!(prompts[0].contains(QUESTION));
    assert!(prompts[1].contains(CONTEXT_HEADER));
    assert!(prompts[1].contains(QUESTION));
    assert!(prompts[1].contains("reported £20 million ($41.1 million) fortune"));
}

#[test]
fn query_results_are_ordered_and_capped() {
    let mut pipeline = pipeline(1000, 0, WriteMode::Append);
    pipeline.ingest(5).unwrap();

    let hits = pipeline.retrieve(QUESTION, 4).unwrap();
    assert_eq!(hits.len(), 4);
    assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));

    let everything = pipeline.retrieve(QUESTION, 50).unwrap();
    assert_eq!(everything.len(), 5);
    assert!(pipeline.retrieve(QUESTION, 0).unwrap().is_empty());
    assert!(pipeline.retrieve("   ", 2).is_err());
}

#[test]
fn smaller_chunks_still_rank_the_story_first() {
    let mut pipeline = pipeline(200, 20, WriteMode::Append);
    let report = pipeline.ingest(5).unwrap();
    assert!(report.chunks > 5);

    let hits = pipeline.retrieve(QUESTION, 3).unwrap();
    assert_eq!(hits[0].article_id, "fixture-0");
    assert!(hits.iter().all(|hit| hit.text.chars().count() <= 200));
}

#[test]
fn repeated_ingest_appends_duplicates() {
    let mut pipeline = pipeline(1000, 0, WriteMode::Append);
    pipeline.ingest(5).unwrap();
    let again = pipeline.ingest(5).unwrap();
    assert_eq!(again.written, 5);
    assert_eq!(pipeline.adapter().store().len(), 10);

    let hits = pipeline.retrieve(QUESTION, 2).unwrap();
    assert_eq!(hits[0].text, hits[1].text);
    assert_ne!(hits[0].id, hits[1].id);
}

#[test]
fn skip_duplicates_makes_reingest_a_no_op() {
    let mut pipeline = pipeline(1000, 0, WriteMode::SkipDuplicates);
    pipeline.ingest(5).unwrap();
    let again = pipeline.ingest(5).unwrap();
    assert_eq!(again.chunks, 5);
    assert_eq!(again.written, 0);
    assert_eq!(pipeline.adapter().store().len(), 5);
}

#[test]
fn ingest_reads_only_the_pages_it_needs() {
    let loader = CorpusLoader::new(FixtureSource::news());
    let chunker = Chunker::new(ChunkerConfig::new(1000, 0).unwrap());
    let mut adapter = VectorStoreAdapter::new(
        HashingEmbedder::default(),
        MemoryVectorStore::new(DistanceMetric::Cosine),
    );

    let report = ingest(&loader, &chunker, &mut adapter, 3).unwrap();
    assert_eq!(report.articles, 3);
    assert_eq!(loader.source().requests.get(), 2);
    let ids: Vec<&str> = adapter
        .store()
        .records()
        .iter()
        .map(|record| record.article_id.as_str())
        .collect();
    assert_eq!(ids, ["fixture-0", "fixture-1", "fixture-2"]);
}

#[test]
fn writes_are_batched_by_embedder_batch_size() {
    let loader = CorpusLoader::new(FixtureSource::news());
    let chunker = Chunker::new(ChunkerConfig::new(120, 0).unwrap());
    let articles = loader.load(1).unwrap();
    let chunks = chunker.chunk_articles(&articles);
    assert!(chunks.len() > 4);

    let mut adapter = VectorStoreAdapter::new(
        HashingEmbedder::default(),
        MemoryVectorStore::new(DistanceMetric::Cosine),
    );
    let written = adapter.write(&chunks).unwrap();
    assert_eq!(written, chunks.len());
    assert_eq!(adapter.embedder().calls.get(), chunks.len().div_ceil(4));
    let stored = adapter.store().records();
    assert!(stored
        .iter()
        .zip(&chunks)
        .all(|(record, chunk)| record.text == chunk.text && record.char_start == chunk.char_start));
}

#[test]
fn grounded_answer_with_empty_store_falls_back_to_baseline_prompt() {
    let pipeline = pipeline(1000, 0, WriteMode::Append);
    let answer = pipeline.answer(QUESTION, 2).unwrap();
    assert!(answer.sources.is_empty());
    assert_eq!(answer.answer, "I don't know.");
    let prompts = pipeline.composer().provider().prompts.borrow();
    assert!(!prompts[0].contains(CONTEXT_HEADER));
}

#[test]
fn comparison_encodes_as_json_report() {
    let mut pipeline = pipeline(1000, 0, WriteMode::Append);
    let report = pipeline.ingest(5).unwrap();
    let comparison = pipeline.compare(QUESTION, 2).unwrap();

    let report_json = serde_json::to_value(report).unwrap();
    assert_eq!(report_json["articles"], 5);
    assert_eq!(report_json["written"], 5);

    let json = serde_json::to_value(&comparison).unwrap();
    assert_eq!(json["baseline"], "I don't know.");
    let sources = json["grounded"]["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["article_id"], "fixture-0");
    assert_eq!(sources[0]["char_start"], 0);
    assert!(sources[0]["distance"].as_f64().unwrap() < 1.0);
    assert!(json["grounded"]["answer"]
        .as_str()
        .unwrap()
        .contains("£20 million"));
}
