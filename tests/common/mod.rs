#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use anyhow::Result;
use newsrag::corpus::DatasetRow;
use newsrag::{ArticleSource, Embedder, LlmProvider, ProviderRequest};

pub const QUESTION: &str = "What kind of fortune does Daniel Radcliffe get when he turns 18?";

pub const RADCLIFFE: &str = "LONDON, England (Reuters) -- Harry Potter star Daniel Radcliffe gains access to a reported £20 million ($41.1 million) fortune as he turns 18 on Monday, but he insists the money won't cast a spell on him. To the disappointment of gossip columnists around the world, the young actor says he has no plans to fritter his cash away on fast cars, drink and celebrity parties. \"I don't plan to be one of those people who, as soon as they turn 18, suddenly buy themselves a massive sports car collection,\" he told an Australian interviewer earlier this month. Radcliffe's earnings from the first five Potter films have been held in a trust fund which he has not been able to touch.";

const OTHERS: [&str; 4] = [
    "Editor's note: In our Behind the Scenes series, correspondents share their experiences covering news and analyze the stories behind the events. Here, a reporter takes readers inside a jail where many inmates are mentally ill. Inmates housed on the forgotten floor are mostly people with severe mental illness, a judge says. Police arrest them after confrontations that often could have been avoided with treatment.",
    "MINNEAPOLIS, Minnesota -- Drivers who were on the Minneapolis bridge when it collapsed told harrowing tales of survival. The whole bridge from one side of the Mississippi to the other just completely gave way, fell all the way down, one witness said. Rescue crews pulled dozens of injured commuters from cars trapped beneath twisted steel and concrete while divers searched the murky river.",
    "WASHINGTON -- Doctors removed several small polyps from the president's colon on Saturday, and none appeared worrisome, a spokesman said. The vice president held presidential power during the procedure, which lasted about two hours. Physicians at the naval medical center said the recovery went smoothly and routine follow-up screening would continue.",
    "ATLANTA, Georgia -- The football star accused of running a dogfighting ring was ordered to stay away from team training camp while league officials review the charges. Prosecutors say animals were bred and trained on rural property in Virginia. Sponsors have begun distancing themselves from the quarterback, and animal welfare groups staged protests outside the stadium.",
];

/// Five short articles, the Radcliffe story first.
pub fn fixture_rows() -> Vec<DatasetRow> {
    std::iter::once(RADCLIFFE)
        .chain(OTHERS)
        .enumerate()
        .map(|(idx, text)| DatasetRow {
            id: Some(format!("fixture-{idx}")),
            text: text.to_string(),
            highlights: None,
        })
        .collect()
}

/// In-memory paged source that counts how many pages were requested.
pub struct FixtureSource {
    rows: Vec<DatasetRow>,
    page_size: usize,
    pub requests: Cell<usize>,
}

impl FixtureSource {
    pub fn new(rows: Vec<DatasetRow>, page_size: usize) -> Self {
        Self {
            rows,
            page_size,
            requests: Cell::new(0),
        }
    }

    pub fn news() -> Self {
        Self::new(fixture_rows(), 2)
    }
}

impl ArticleSource for FixtureSource {
    fn fetch_page(&self, offset: usize, length: usize) -> Result<Vec<DatasetRow>> {
        self.requests.set(self.requests.get() + 1);
        let start = offset.min(self.rows.len());
        let end = offset.saturating_add(length).min(self.rows.len());
        Ok(self.rows[start..end].to_vec())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

const STOPWORDS: [&str; 24] = [
    "a", "an", "and", "as", "at", "be", "by", "does", "for", "get", "he", "his", "in", "is", "it",
    "kind", "of", "on", "the", "to", "was", "what", "when", "with",
];

/// Bag-of-words embedder: lowercase word tokens hashed into a fixed number of
/// buckets, L2-normalized.
pub struct HashingEmbedder {
    dims: usize,
    pub calls: Cell<usize>,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: Cell::new(0),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .filter(|token| !STOPWORDS.contains(&token.as_str()))
        {
            let bucket = crc32fast::hash(token.as_bytes()) as usize % self.dims;
            out[bucket] += 1.0;
        }
        let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|v| *v /= norm);
        }
        out
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Embedder for HashingEmbedder {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.set(self.calls.get() + 1);
        Ok(inputs.iter().map(|input| self.vector(input)).collect())
    }

    fn batch_size(&self) -> usize {
        4
    }
}

/// Chat double that records prompts and only "knows" the answer when the
/// prompt carries it.
#[derive(Default)]
pub struct RecordingProvider {
    pub prompts: RefCell<Vec<String>>,
}

impl LlmProvider for RecordingProvider {
    fn answer(&self, request: &ProviderRequest) -> Result<String> {
        self.prompts.borrow_mut().push(request.prompt.to_string());
        if request.prompt.contains("£20 million") {
            Ok("He gains access to a reported £20 million fortune.".to_string())
        } else {
            Ok("I don't know.".to_string())
        }
    }

    fn model(&self) -> &str {
        "recording"
    }
}
