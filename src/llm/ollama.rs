/// Chat model served by a local Ollama instance (`POST /api/chat`).
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ChatRequest, LanguageModel, LlmError};

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Blocking client for Ollama's non-streaming chat endpoint.
pub struct OllamaChat {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaChat {
    pub fn new(base_url: &str, model: &str, timeout: Option<Duration>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed(format!("client build error: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    fn body<'a>(&'a self, request: &'a ChatRequest) -> ChatBody<'a> {
        ChatBody {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
            },
        }
    }
}

impl LanguageModel for OllamaChat {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        info!(
            "Requesting completion from {} (temperature {})",
            self.model, request.temperature
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.body(request))
            .send()
            .map_err(|e| {
                LlmError::RequestFailed(format!(
                    "connection error (is Ollama running at {}?): {e}",
                    self.endpoint
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(LlmError::RequestFailed(format!(
                "Ollama API error {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        debug!("Completion returned {} chars", parsed.message.content.len());
        Ok(parsed.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            system: "You design lessons.".to_string(),
            user: "Plan a lecture.".to_string(),
            temperature: 0.3,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let chat = OllamaChat::new("http://localhost:11434/", "gpt-oss:20b", None).unwrap();
        assert_eq!(chat.endpoint, "http://localhost:11434/api/chat");

        let req = request();
        let value = serde_json::to_value(chat.body(&req)).unwrap();
        assert_eq!(value["model"], "gpt-oss:20b");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Plan a lecture.");
        let temp = value["options"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_parse_response() {
        let json = r###"{"model":"gpt-oss:20b","message":{"role":"assistant","content":"## 1 Overview"},"done":true}"###;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.message.content, "## 1 Overview");
    }

    #[test]
    fn test_unreachable_server_is_request_error() {
        let chat = OllamaChat::new("http://127.0.0.1:9", "m", Some(Duration::from_secs(2))).unwrap();
        let err = chat.complete(&request()).unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed(_)));
    }
}
