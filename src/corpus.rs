//! Lazy article loading from paged dataset sources.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

/// Largest page the datasets-server rows endpoint will serve.
pub const MAX_ROWS_PER_PAGE: usize = 100;

/// One article pulled from the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Position within the loaded batch (0-based).
    pub index: usize,
    /// Source-assigned row identifier, or the row offset when the source has none.
    pub id: String,
    /// Full article body.
    pub text: String,
    /// Reference summary shipped alongside the article, when available.
    pub highlights: Option<String>,
}

/// Raw row handed back by an [`ArticleSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    /// Source-assigned identifier.
    pub id: Option<String>,
    /// Article body.
    pub text: String,
    /// Optional reference summary.
    pub highlights: Option<String>,
}

impl DatasetRow {
    /// Builds a row without id or summary.
    pub fn from_text<T: Into<String>>(text: T) -> Self {
        Self {
            id: None,
            text: text.into(),
            highlights: None,
        }
    }
}

/// Paged access to an ordered upstream dataset.
pub trait ArticleSource {
    /// Returns up to `length` rows starting at `offset`, in source order.
    ///
    /// Returning fewer rows than requested signals the end of the dataset.
    fn fetch_page(&self, offset: usize, length: usize) -> Result<Vec<DatasetRow>>;

    /// Preferred number of rows per request.
    fn page_size(&self) -> usize {
        MAX_ROWS_PER_PAGE
    }
}

impl<S: ArticleSource + ?Sized> ArticleSource for &S {
    fn fetch_page(&self, offset: usize, length: usize) -> Result<Vec<DatasetRow>> {
        (**self).fetch_page(offset, length)
    }

    fn page_size(&self) -> usize {
        (**self).page_size()
    }
}

/// Front door for pulling a bounded number of articles from a source.
pub struct CorpusLoader<S> {
    source: S,
}

impl<S: ArticleSource> CorpusLoader<S> {
    /// Wraps a dataset source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns a lazy stream over the first `count` articles.
    ///
    /// Every call restarts from the beginning of the source.
    pub fn stream(&self, count: usize) -> ArticleStream<'_, S> {
        ArticleStream::new(&self.source, count)
    }

    /// Collects the first `count` articles, failing on the first source error.
    pub fn load(&self, count: usize) -> Result<Vec<Article>> {
        self.stream(count).collect()
    }

    /// Borrows the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Finite iterator yielding at most `count` articles, fetching pages on demand.
pub struct ArticleStream<'a, S> {
    source: &'a S,
    remaining: usize,
    next_offset: usize,
    produced: usize,
    buffer: VecDeque<DatasetRow>,
    exhausted: bool,
}

impl<'a, S: ArticleSource> ArticleStream<'a, S> {
    fn new(source: &'a S, count: usize) -> Self {
        Self {
            source,
            remaining: count,
            next_offset: 0,
            produced: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let length = self.source.page_size().clamp(1, MAX_ROWS_PER_PAGE).min(self.remaining);
        let page = self.source.fetch_page(self.next_offset, length)?;
        debug!(
            offset = self.next_offset,
            requested = length,
            received = page.len(),
            "fetched dataset page"
        );
        if page.len() < length {
            self.exhausted = true;
        }
        self.next_offset += page.len();
        self.buffer.extend(page);
        Ok(())
    }
}

impl<S: ArticleSource> Iterator for ArticleStream<'_, S> {
    type Item = Result<Article>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.refill() {
                self.remaining = 0;
                return Some(Err(err));
            }
        }
        let row = self.buffer.pop_front()?;
        let index = self.produced;
        let offset_id = self.next_offset - self.buffer.len() - 1;
        self.produced += 1;
        self.remaining -= 1;
        Some(Ok(Article {
            index,
            id: row.id.unwrap_or_else(|| offset_id.to_string()),
            text: row.text,
            highlights: row.highlights,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.buffer.len().min(self.remaining), Some(self.remaining))
    }
}

/// Location and field layout of a Hugging Face dataset.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Datasets-server base URL.
    pub base_url: String,
    /// Dataset repository id.
    pub dataset: String,
    /// Dataset configuration name.
    pub config: String,
    /// Split to read.
    pub split: String,
    /// Row field holding the article text.
    pub text_field: String,
    /// Row field holding the row identifier.
    pub id_field: Option<String>,
    /// Row field holding the reference summary.
    pub summary_field: Option<String>,
    /// Optional Hugging Face access token.
    pub token: Option<String>,
    /// Rows requested per page.
    pub page_size: usize,
    /// HTTP timeout per page request.
    pub timeout: Duration,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            base_url: "https://datasets-server.huggingface.co".to_string(),
            dataset: "abisee/cnn_dailymail".to_string(),
            config: "3.0.0".to_string(),
            split: "train".to_string(),
            text_field: "article".to_string(),
            id_field: Some("id".to_string()),
            summary_field: Some("highlights".to_string()),
            token: None,
            page_size: MAX_ROWS_PER_PAGE,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Blocking client for the datasets-server `/rows` endpoint.
pub struct HfDatasetSource {
    client: Client,
    endpoint: Url,
    config: DatasetConfig,
}

impl HfDatasetSource {
    /// Builds a client for the configured dataset.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        anyhow::ensure!(!config.dataset.trim().is_empty(), "dataset name is required");
        anyhow::ensure!(!config.text_field.trim().is_empty(), "text field is required");
        let endpoint = Url::parse(&format!("{}/rows", config.base_url.trim_end_matches('/')))
            .with_context(|| format!("invalid datasets-server URL {}", config.base_url))?;
        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref().filter(|t| !t.trim().is_empty()) {
            let auth = format!("Bearer {}", token.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).context("invalid Hugging Face token")?,
            );
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build dataset HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    fn page_url(&self, offset: usize, length: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("dataset", &self.config.dataset)
            .append_pair("config", &self.config.config)
            .append_pair("split", &self.config.split)
            .append_pair("offset", &offset.to_string())
            .append_pair("length", &length.to_string());
        url
    }

    fn rows_from_response(&self, response: RowsResponse) -> Result<Vec<DatasetRow>> {
        response
            .rows
            .into_iter()
            .map(|entry| {
                let text = string_field(&entry.row, &self.config.text_field).ok_or_else(|| {
                    anyhow!(
                        "row {} has no string field '{}'",
                        entry.row_idx,
                        self.config.text_field
                    )
                })?;
                if entry.truncated_cells.contains(&self.config.text_field) {
                    bail!(
                        "row {} field '{}' was truncated by the dataset server",
                        entry.row_idx,
                        self.config.text_field
                    );
                }
                let id = self
                    .config
                    .id_field
                    .as_deref()
                    .and_then(|field| string_field(&entry.row, field));
                let highlights = self
                    .config
                    .summary_field
                    .as_deref()
                    .and_then(|field| string_field(&entry.row, field));
                Ok(DatasetRow {
                    id,
                    text,
                    highlights,
                })
            })
            .collect()
    }
}

impl ArticleSource for HfDatasetSource {
    fn fetch_page(&self, offset: usize, length: usize) -> Result<Vec<DatasetRow>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let url = self.page_url(offset, length.min(MAX_ROWS_PER_PAGE));
        let resp = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to reach dataset source at {url}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("dataset source returned {}: {}", status, body);
        }
        let parsed: RowsResponse = resp.json().context("failed to parse dataset rows")?;
        self.rows_from_response(parsed)
    }

    fn page_size(&self) -> usize {
        self.config.page_size
    }
}

fn string_field(row: &Map<String, Value>, field: &str) -> Option<String> {
    row.get(field).and_then(Value::as_str).map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<RowEntry>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    #[serde(default)]
    row_idx: usize,
    row: Map<String, Value>,
    /// Cells the server cut short to fit its response size limit.
    #[serde(default)]
    truncated_cells: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FixedSource {
        rows: Vec<String>,
        page_size: usize,
        requests: RefCell<Vec<(usize, usize)>>,
    }

    impl FixedSource {
        fn new(count: usize, page_size: usize) -> Self {
            Self {
                rows: (0..count).map(|i| format!("article {i}")).collect(),
                page_size,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl ArticleSource for FixedSource {
        fn fetch_page(&self, offset: usize, length: usize) -> Result<Vec<DatasetRow>> {
            self.requests.borrow_mut().push((offset, length));
            Ok(self
                .rows
                .iter()
                .skip(offset)
                .take(length)
                .cloned()
                .map(DatasetRow::from_text)
                .collect())
        }

        fn page_size(&self) -> usize {
            self.page_size
        }
    }

    struct FailingSource;

    impl ArticleSource for FailingSource {
        fn fetch_page(&self, _offset: usize, _length: usize) -> Result<Vec<DatasetRow>> {
            bail!("connection refused")
        }
    }

    #[test]
    fn yields_requested_count_in_source_order() {
        let loader = CorpusLoader::new(FixedSource::new(10, 3));
        let articles = loader.load(5).expect("load");
        let texts: Vec<_> = articles.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(
            texts,
            ["article 0", "article 1", "article 2", "article 3", "article 4"]
        );
        assert!(articles.iter().enumerate().all(|(i, a)| a.index == i));
        assert_eq!(articles[4].id, "4");
    }

    #[test]
    fn stops_when_source_runs_dry() {
        let loader = CorpusLoader::new(FixedSource::new(4, 3));
        let articles = loader.load(10).expect("load");
        assert_eq!(articles.len(), 4);
        assert_eq!(*loader.source().requests.borrow(), vec![(0, 3), (3, 3)]);
    }

    #[test]
    fn fetches_pages_lazily() {
        let loader = CorpusLoader::new(FixedSource::new(100, 2));
        let mut stream = loader.stream(50);
        stream.next().unwrap().unwrap();
        stream.next().unwrap().unwrap();
        assert_eq!(loader.source().requests.borrow().len(), 1);
        stream.next().unwrap().unwrap();
        assert_eq!(loader.source().requests.borrow().len(), 2);
    }

    #[test]
    fn never_requests_past_the_remaining_count() {
        let loader = CorpusLoader::new(FixedSource::new(100, 100));
        loader.load(5).expect("load");
        assert_eq!(*loader.source().requests.borrow(), vec![(0, 5)]);
    }

    #[test]
    fn restarts_from_the_beginning() {
        let loader = CorpusLoader::new(FixedSource::new(10, 4));
        let first = loader.load(3).expect("first");
        let second = loader.load(3).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn zero_count_makes_no_requests() {
        let loader = CorpusLoader::new(FixedSource::new(10, 4));
        assert!(loader.load(0).expect("load").is_empty());
        assert!(loader.source().requests.borrow().is_empty());
    }

    #[test]
    fn surfaces_source_errors_once() {
        let loader = CorpusLoader::new(FailingSource);
        let mut stream = loader.stream(3);
        let err = stream.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(stream.next().is_none());
    }

    #[test]
    fn parses_rows_response() {
        let source = HfDatasetSource::new(DatasetConfig::default()).expect("source");
        let body = r#"{
            "features": [],
            "rows": [
                {"row_idx": 0, "row": {"article": "LONDON, England (Reuters) -- text", "highlights": "summary", "id": "42c027e4"}, "truncated_cells": []},
                {"row_idx": 1, "row": {"article": "second", "highlights": null}, "truncated_cells": []}
            ],
            "num_rows_total": 287113
        }"#;
        let parsed: RowsResponse = serde_json::from_str(body).expect("json");
        let rows = source.rows_from_response(parsed).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id.as_deref(), Some("42c027e4"));
        assert_eq!(rows[0].highlights.as_deref(), Some("summary"));
        assert_eq!(rows[1].id, None);
        assert_eq!(rows[1].text, "second");
    }

    #[test]
    fn rejects_truncated_article_cells() {
        let source = HfDatasetSource::new(DatasetConfig::default()).expect("source");
        let body = r#"{"rows": [
            {"row_idx": 3, "row": {"article": "cut sho", "highlights": "summary"}, "truncated_cells": ["article"]}
        ]}"#;
        let parsed: RowsResponse = serde_json::from_str(body).expect("json");
        let err = source.rows_from_response(parsed).unwrap_err();
        assert!(err.to_string().contains("row 3"));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn tolerates_truncated_summary_cells() {
        let source = HfDatasetSource::new(DatasetConfig::default()).expect("source");
        let body = r#"{"rows": [
            {"row_idx": 0, "row": {"article": "full text", "highlights": "cut"}, "truncated_cells": ["highlights"]}
        ]}"#;
        let parsed: RowsResponse = serde_json::from_str(body).expect("json");
        let rows = source.rows_from_response(parsed).expect("rows");
        assert_eq!(rows[0].text, "full text");
    }

    #[test]
    fn rejects_rows_missing_text() {
        let source = HfDatasetSource::new(DatasetConfig::default()).expect("source");
        let parsed: RowsResponse =
            serde_json::from_str(r#"{"rows": [{"row_idx": 7, "row": {"id": "x"}}]}"#).unwrap();
        let err = source.rows_from_response(parsed).unwrap_err();
        assert!(err.to_string().contains("row 7"));
    }

    #[test]
    fn builds_page_url() {
        let source = HfDatasetSource::new(DatasetConfig::default()).expect("source");
        let url = source.page_url(100, 5);
        assert_eq!(url.path(), "/rows");
        let query = url.query().unwrap_or_default();
        assert!(query.contains("dataset=abisee%2Fcnn_dailymail"));
        assert!(query.contains("config=3.0.0"));
        assert!(query.contains("offset=100"));
        assert!(query.contains("length=5"));
    }
}
