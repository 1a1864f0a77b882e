use std::sync::Once;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{LlmProvider, ProviderRequest};

/// OpenAI-compatible chat completions (vLLM, llama.cpp server, OpenAI).
pub struct OpenAiProvider {
    api_key: Option<String>,
    endpoint: String,
    model: String,
    client: Client,
    context_window_notice: Once,
}

impl OpenAiProvider {
    /// Builds a client for `{base_url}/chat/completions`.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing chat model name");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build chat HTTP client")?;
        Ok(Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
            client,
            context_window_notice: Once::new(),
        })
    }
}

impl LlmProvider for OpenAiProvider {
    fn answer(&self, request: &ProviderRequest) -> Result<String> {
        self.context_window_notice.call_once(|| {
            warn!(
                context_window = request.context_window,
                model = %self.model,
                "chat completions API has no context window field; the server's setting applies"
            );
        });
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).context("invalid chat API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = chat_request(&self.model, request);
        let resp = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .with_context(|| format!("failed to call chat completions at {}", self.endpoint))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("chat endpoint returned {}: {}", status, text);
        }
        let parsed: ChatResponse = resp.json().context("failed to parse chat response")?;
        parsed.into_answer()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn chat_request<'a>(model: &'a str, request: &ProviderRequest<'a>) -> ChatRequest<'a> {
    ChatRequest {
        model,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        messages: vec![ChatMessage {
            role: "user",
            content: request.prompt,
        }],
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl ChatResponse {
    fn into_answer(self) -> Result<String> {
        match self.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content.unwrap_or_default()),
            None => bail!("chat response contained no choices"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
