/// Embedder backed by a local Ollama server (`POST /api/embed`).
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{Embedder, EmbedderError};

const PROBE_TEXT: &str = "dimension probe";

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP client for Ollama's embedding endpoint.
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create an embedder for `model` served at `base_url`.
    ///
    /// When `dimensions` is `None` the model is asked to embed a short probe
    /// string once and the width of the answer is used.
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: Option<usize>,
        timeout: Option<Duration>,
    ) -> Result<Self, EmbedderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedderError::RequestFailed(format!("client build error: {e}")))?;

        let mut embedder = Self {
            client,
            endpoint: format!("{}/api/embed", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions: dimensions.unwrap_or(0),
        };

        if dimensions.is_none() {
            let probe = embedder.request(&[PROBE_TEXT])?;
            embedder.dimensions = probe.first().map(Vec::len).unwrap_or(0);
            if embedder.dimensions == 0 {
                return Err(EmbedderError::InvalidResponse(
                    "probe returned an empty vector".to_string(),
                ));
            }
            info!(
                "Embedding model {} reports {} dimensions",
                embedder.model, embedder.dimensions
            );
        }

        Ok(embedder)
    }

    fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        debug!("Embedding {} texts with {}", texts.len(), self.model);
        let body = json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| {
                EmbedderError::RequestFailed(format!(
                    "connection error (is Ollama running at {}?): {e}",
                    self.endpoint
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(EmbedderError::RequestFailed(format!(
                "Ollama API error {status}: {text}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| EmbedderError::InvalidResponse(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbedderError::CountMismatch {
                expected: texts.len(),
                actual: parsed.embeddings.len(),
            });
        }
        Ok(parsed.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.request(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedderError::InvalidResponse("empty embedding response".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let json = r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2],[0.3,0.4]]}"#;
        let parsed: EmbedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.embeddings, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_configured_dimensions_skip_probe() {
        // No server is contacted when the width is known up front.
        let embedder =
            OllamaEmbedder::new("http://127.0.0.1:9/", "nomic-embed-text:v1.5", Some(768), None)
                .unwrap();
        assert_eq!(embedder.dimensions(), 768);
        assert_eq!(embedder.model_name(), "nomic-embed-text:v1.5");
        assert_eq!(embedder.endpoint, "http://127.0.0.1:9/api/embed");
    }

    #[test]
    fn test_unreachable_server_is_request_error() {
        let embedder =
            OllamaEmbedder::new("http://127.0.0.1:9", "nomic-embed-text", Some(768), None).unwrap();
        let err = embedder.embed("hello").unwrap_err();
        assert!(matches!(err, EmbedderError::RequestFailed(_)));
    }
}
