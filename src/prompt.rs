//! Prompt template with `{question}` and `{context}` slots.

use std::fmt;

use anyhow::Result;

/// Template used for both the baseline and the grounded call.
pub const DEFAULT_TEMPLATE: &str = "Answer the question below. If you cannot answer it, reply \"I don't know\".\n\n{context}Question: {question}\nAnswer:";

/// Header opening the rendered context block.
pub const CONTEXT_HEADER: &str = "Context:";

/// Separator placed between context passages.
const PASSAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Question,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// Parsed prompt template.
///
/// Slots are filled in a single pass, so slot-like text inside a question or
/// a context passage is copied through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parses a template. `{question}` is required, `{context}` is optional.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;
        while let Some(pos) = rest.find('{') {
            literal.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            let slot = if tail.starts_with("{question}") {
                Some((Slot::Question, "{question}".len()))
            } else if tail.starts_with("{context}") {
                Some((Slot::Context, "{context}".len()))
            } else {
                None
            };
            match slot {
                Some((slot, len)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(slot));
                    rest = &tail[len..];
                }
                None => {
                    literal.push('{');
                    rest = &tail[1..];
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        anyhow::ensure!(
            segments.contains(&Segment::Slot(Slot::Question)),
            "prompt template must contain a {{question}} slot"
        );
        Ok(Self { segments })
    }

    /// Renders the prompt; the context block appears only when `context`
    /// holds at least one non-blank passage.
    pub fn render(&self, question: &str, context: Option<&[String]>) -> String {
        let block = context.and_then(render_context);
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(Slot::Question) => out.push_str(question.trim()),
                Segment::Slot(Slot::Context) => {
                    if let Some(block) = &block {
                        out.push_str(block);
                    }
                }
            }
        }
        out
    }

    /// True when the template can carry retrieved context.
    pub fn has_context_slot(&self) -> bool {
        self.segments.contains(&Segment::Slot(Slot::Context))
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE).expect("default template has a question slot")
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Slot(Slot::Question) => f.write_str("{question}")?,
                Segment::Slot(Slot::Context) => f.write_str("{context}")?,
            }
        }
        Ok(())
    }
}

/// Renders the context block, or `None` when there is nothing to ground on.
pub fn render_context(passages: &[String]) -> Option<String> {
    let joined = passages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR);
    if joined.is_empty() {
        return None;
    }
    Some(format!("{CONTEXT_HEADER}\n{joined}\n\n"))
}
