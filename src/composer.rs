//! Renders prompts and submits them to the chat model.

use anyhow::{Context, Result};
use tracing::info;

use crate::prompt::PromptTemplate;
use crate::providers::{LlmProvider, ProviderRequest};

/// Sampling and sizing settings sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatSettings {
    /// Context window requested from the model server, in tokens.
    pub context_window: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            context_window: 4096,
            temperature: 0.0,
            max_tokens: 512,
        }
    }
}

/// Stateless prompt renderer plus model client; every call is one request.
pub struct AnswerComposer<P> {
    provider: P,
    template: PromptTemplate,
    settings: ChatSettings,
}

impl<P: LlmProvider> AnswerComposer<P> {
    /// Uses the default template.
    pub fn new(provider: P, settings: ChatSettings) -> Self {
        Self {
            provider,
            template: PromptTemplate::default(),
            settings,
        }
    }

    /// Uses a custom template; it must carry a `{context}` slot.
    pub fn with_template(
        provider: P,
        template: PromptTemplate,
        settings: ChatSettings,
    ) -> Result<Self> {
        anyhow::ensure!(
            template.has_context_slot(),
            "prompt template must contain a {{context}} slot"
        );
        Ok(Self {
            provider,
            template,
            settings,
        })
    }

    /// Renders the prompt that [`AnswerComposer::answer`] would submit.
    pub fn compose(&self, question: &str, context: Option<&[String]>) -> String {
        self.template.render(question, context)
    }

    /// Submits the rendered prompt and returns the raw completion.
    pub fn answer(&self, question: &str, context: Option<&[String]>) -> Result<String> {
        let prompt = self.compose(question, context);
        let request = ProviderRequest {
            prompt: &prompt,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            context_window: self.settings.context_window,
        };
        let passages = context.map_or(0, <[String]>::len);
        info!(
            model = self.provider.model(),
            passages,
            prompt_chars = prompt.chars().count(),
            "submitting prompt"
        );
        self.provider
            .answer(&request)
            .with_context(|| format!("chat model {} failed to answer", self.provider.model()))
    }

    /// Active template.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Active settings.
    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}
