//! Embedding clients that turn chunk text into vectors.

use anyhow::{anyhow, Result};

pub mod openai;

pub use openai::{EmbedderConfig, OpenAiEmbedder};

/// Deterministic text-to-vector function backed by an external model.
pub trait Embedder {
    /// Embeds a batch of inputs, returning one vector per input in order.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Maximum number of inputs accepted per [`Embedder::embed_batch`] call.
    fn batch_size(&self) -> usize {
        32
    }

    /// Embeds a single input.
    fn embed_one(&self, input: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[input])?
            .pop()
            .ok_or_else(|| anyhow!("embedder returned no vector"))
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(inputs)
    }

    fn batch_size(&self) -> usize {
        (**self).batch_size()
    }
}
