/// Embedder trait and shared types for text embedding.
pub mod mock;
pub mod ollama;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    RequestFailed(String),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("model returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model (e.g. `nomic-embed-text:v1.5`).
    fn model_name(&self) -> &str;
}
