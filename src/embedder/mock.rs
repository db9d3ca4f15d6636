/// Mock embedder for tests and offline runs.
///
/// Generates deterministic embeddings based on a text hash.
use std::hash::{DefaultHasher, Hash, Hasher};

use super::{Embedder, EmbedderError};

/// A mock embedder that produces deterministic vectors from text hashes.
///
/// Useful for running the pipeline without an embedding server.
pub struct MockEmbedder {
    pub model: String,
    pub dimensions: usize,
}

impl MockEmbedder {
    /// Create a new `MockEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            model: format!("mock-{dimensions}"),
            dimensions,
        }
    }

    /// Create a mock that reports `model` as its identity.
    #[must_use]
    pub fn named(model: &str, dimensions: usize) -> Self {
        Self {
            model: model.to_string(),
            dimensions,
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        // Use the hash bytes to seed deterministic float values
        let bytes = hash.to_le_bytes();
        let mut embedding = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let b = bytes[i % 8].rotate_left((i / 8) as u32 % 8);
            embedding.push(f32::from(b) / 255.0 + 0.01);
        }

        // L2 normalize
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for v in &mut embedding {
                *v *= inv;
            }
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
