//! Chat-completion backends used to draft lesson plans.
use thiserror::Error;

pub mod ollama;

pub use ollama::OllamaChat;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One system + user exchange sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
}

/// Trait for a model that turns a chat request into text.
pub trait LanguageModel: Send + Sync {
    /// Run one completion and return the assistant message.
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}
