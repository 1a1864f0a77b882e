use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LlmProvider, ProviderRequest};

/// Locally hosted model served by Ollama.
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: Client,
}

impl OllamaProvider {
    /// Builds a client for `{base_url}/api/chat`.
    pub fn new(base_url: &str, model: String, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing Ollama model name");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Ollama HTTP client")?;
        Ok(Self {
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model,
            client,
        })
    }
}

impl LlmProvider for OllamaProvider {
    fn answer(&self, request: &ProviderRequest) -> Result<String> {
        let body = chat_request(&self.model, request);
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .with_context(|| format!("failed to call Ollama at {}", self.endpoint))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Ollama returned {}: {}", status, text);
        }
        let parsed: OllamaResponse = resp.json().context("failed to parse Ollama response")?;
        debug!(
            model = %self.model,
            eval_count = parsed.eval_count.unwrap_or_default(),
            "received completion"
        );
        Ok(parsed.message.content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn chat_request<'a>(model: &'a str, request: &ProviderRequest<'a>) -> OllamaRequest<'a> {
    OllamaRequest {
        model,
        stream: false,
        messages: vec![OllamaMessage {
            role: "user",
            content: request.prompt,
        }],
        options: OllamaOptions {
            num_ctx: request.context_window,
            num_predict: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<OllamaMessage<'a>>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_ctx: usize,
    num_predict: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: AssistantMessage,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
