//! Chat-completion backends used by the answer composer.

use anyhow::Result;
use clap::ValueEnum;

mod ollama;
mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Trait implemented by concrete LLM providers.
pub trait LlmProvider {
    /// Submits one prompt and returns the raw completion text.
    fn answer(&self, request: &ProviderRequest) -> Result<String>;

    /// Model identifier the provider submits to.
    fn model(&self) -> &str;
}

impl<P: LlmProvider + ?Sized> LlmProvider for Box<P> {
    fn answer(&self, request: &ProviderRequest) -> Result<String> {
        (**self).answer(request)
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Request envelope shared by the various providers.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    /// Fully rendered prompt.
    pub prompt: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: usize,
    /// Context window requested from the server, in tokens.
    pub context_window: usize,
}

/// Supported chat backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ChatBackend {
    /// Ollama's native `/api/chat`.
    #[default]
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` server.
    Openai,
}
