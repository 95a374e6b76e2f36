//! Anthropic Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm_client::{
    api_error, BackendError, TextGenerator, MAX_TOKENS, PROBE_MAX_TOKENS, PROBE_PROMPT,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    /// Concatenates every text block; tool or thinking blocks are skipped.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect()
    }
}

#[derive(Clone)]
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(http: Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn call(&self, prompt: &str, max_tokens: u32) -> Result<String, BackendError> {
        let request_body = AnthropicRequest {
            model: &self.model,
            max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: AnthropicResponse = response.json().await?;
        if let Some(usage) = &body.usage {
            debug!(
                "Claude call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text = body.text();
        if text.trim().is_empty() {
            return Err(BackendError::EmptyContent);
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.call(prompt, MAX_TOKENS).await
    }

    async fn probe(&self) -> Result<(), BackendError> {
        self.call(PROBE_PROMPT, PROBE_MAX_TOKENS).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::spawn_stub;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn messages(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("sk-test") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "type": "error",
                    "error": {"type": "authentication_error", "message": "invalid x-api-key"}
                })),
            );
        }
        assert_eq!(body["model"], "claude-3-haiku-20240307");
        assert_eq!(body["messages"][0]["role"], "user");
        let max_tokens = body["max_tokens"].as_u64().unwrap();
        (
            StatusCode::OK,
            Json(json!({
                "content": [
                    {"type": "text", "text": "**🚨 Severity:** HIGH"},
                    {"type": "text", "text": format!(" (max_tokens={max_tokens})")}
                ],
                "usage": {"input_tokens": 12, "output_tokens": 7}
            })),
        )
    }

    fn client(base_url: String, api_key: &str) -> AnthropicClient {
        AnthropicClient::new(
            Client::new(),
            api_key.to_string(),
            "claude-3-haiku-20240307".to_string(),
        )
        .with_base_url(base_url)
    }

    #[test]
    fn test_text_concatenates_text_blocks_only() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "a"},
                {"type": "tool_use"},
                {"type": "text", "text": "b"}
            ]
        }))
        .unwrap();
        assert_eq!(response.text(), "ab");
    }

    #[tokio::test]
    async fn test_generate_joins_content_and_sends_max_tokens() {
        let base = spawn_stub(Router::new().route("/v1/messages", post(messages))).await;
        let text = client(base, "sk-test").generate("analyze").await.unwrap();
        assert_eq!(text, "**🚨 Severity:** HIGH (max_tokens=2000)");
    }

    #[tokio::test]
    async fn test_auth_failure_surfaces_api_message() {
        let base = spawn_stub(Router::new().route("/v1/messages", post(messages))).await;
        let err = client(base, "wrong").generate("analyze").await.unwrap_err();
        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid x-api-key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_succeeds_with_valid_key() {
        let base = spawn_stub(Router::new().route("/v1/messages", post(messages))).await;
        assert!(client(base, "sk-test").probe().await.is_ok());
    }
}
