//! Ollama `/api/chat`, non-streaming.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm_client::{api_error, BackendError, TextGenerator};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    api_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(http: Client, base_url: &str, model: String) -> Self {
        Self {
            http,
            api_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .http
            .post(&self.api_url)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: ChatResponse = response.json().await?;
        body.message
            .map(|m| m.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(BackendError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::spawn_stub;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn chat(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        assert_eq!(body["stream"], false);
        if body["model"] != "qwen2:0.5b" {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("model '{}' not found", body["model"].as_str().unwrap_or(""))
                })),
            );
        }
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
        (
            StatusCode::OK,
            Json(json!({
                "model": "qwen2:0.5b",
                "message": {"role": "assistant", "content": format!("echo: {prompt}")},
                "done": true
            })),
        )
    }

    async fn empty_chat() -> Json<Value> {
        Json(json!({"model": "qwen2:0.5b", "done": true}))
    }

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let base = spawn_stub(Router::new().route("/api/chat", post(chat))).await;
        // Trailing slash on the configured base URL is tolerated.
        let client = OllamaClient::new(
            Client::new(),
            &format!("{base}/"),
            "qwen2:0.5b".to_string(),
        );
        assert_eq!(client.generate("disk full").await.unwrap(), "echo: disk full");
    }

    #[tokio::test]
    async fn test_unknown_model_is_api_error() {
        let base = spawn_stub(Router::new().route("/api/chat", post(chat))).await;
        let client = OllamaClient::new(Client::new(), &base, "llama9".to_string());
        match client.generate("disk full").await.unwrap_err() {
            BackendError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model 'llama9' not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_message_is_empty_content() {
        let base = spawn_stub(Router::new().route("/api/chat", post(empty_chat))).await;
        let client = OllamaClient::new(Client::new(), &base, "qwen2:0.5b".to_string());
        assert!(matches!(client.generate("x").await, Err(BackendError::EmptyContent)));
    }

    #[tokio::test]
    async fn test_probe_uses_default_generation() {
        let base = spawn_stub(Router::new().route("/api/chat", post(chat))).await;
        let client = OllamaClient::new(Client::new(), &base, "qwen2:0.5b".to_string());
        assert!(client.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_retryable_http_error() {
        let client = OllamaClient::new(
            Client::new(),
            "http://127.0.0.1:1",
            "qwen2:0.5b".to_string(),
        );
        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, BackendError::Http(_)));
        assert!(err.is_retryable());
    }
}
