pub mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use std::time::Duration;

/// Decoding parameters for a single generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Greedy decoding with a fixed seed; overrides `temperature`.
    pub deterministic: bool,
}

impl GenerationOptions {
    pub fn effective_temperature(&self) -> f32 {
        if self.deterministic {
            0.0
        } else {
            self.temperature
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 512,
            temperature: 0.0,
            deterministic: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode model server response: {0}")]
    Decode(reqwest::Error),

    #[error("Model server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model {model:?} is not available (found: {available:?})")]
    ModelNotFound {
        model: String,
        available: Vec<String>,
    },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
}

impl ModelError {
    /// Classify an error raised while reading a response body.
    pub(crate) fn from_body(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ModelError::Decode(error)
        } else {
            ModelError::Http(error)
        }
    }
}

/// Turns a prompt into a response string.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ModelError>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}
