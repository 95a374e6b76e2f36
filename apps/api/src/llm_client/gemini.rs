//! Google Gemini `generateContent` API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm_client::{
    api_error, BackendError, TextGenerator, MAX_TOKENS, PROBE_MAX_TOKENS, PROBE_PROMPT,
};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate; a blocked or empty answer becomes an error.
    fn into_text(self) -> Result<String, BackendError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::Blocked(reason));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(BackendError::EmptyContent)?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if !text.trim().is_empty() {
            return Ok(text);
        }
        match candidate.finish_reason {
            Some(reason) if reason != "STOP" => Err(BackendError::Blocked(reason)),
            _ => Err(BackendError::EmptyContent),
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn call(&self, prompt: &str, max_tokens: u32) -> Result<String, BackendError> {
        let request_body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        let response = self
            .http
            .post(format!("{}/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: GenerateResponse = response.json().await?;
        body.into_text()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
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
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn generate_content(
        Path(call): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("g-test") {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({"error": {"code": 403, "message": "API key not valid"}})),
            );
        }
        assert_eq!(call, "gemini-2.5-flash:generateContent");
        assert_eq!(body["contents"][0]["role"], "user");
        let max_tokens = body["generationConfig"]["maxOutputTokens"].as_u64().unwrap();
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": {"parts": [
                        {"text": "**🚨 Severity:** LOW"},
                        {"text": format!(" (max_tokens={max_tokens})")}
                    ]},
                    "finishReason": "STOP"
                }]
            })),
        )
    }

    async fn stub() -> String {
        spawn_stub(Router::new().route("/models/:call", post(generate_content))).await
    }

    fn client(base: String, api_key: &str) -> GeminiClient {
        GeminiClient::new(
            Client::new(),
            api_key.to_string(),
            "gemini-2.5-flash".to_string(),
        )
        .with_base_url(format!("{base}/models"))
    }

    fn parse(value: serde_json::Value) -> GenerateResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parts_are_joined() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"text": "**🚨 Severity:** "}, {"text": "MEDIUM"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(response.into_text().unwrap(), "**🚨 Severity:** MEDIUM");
    }

    #[test]
    fn test_safety_stop_is_blocked() {
        let response = parse(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }));
        assert!(matches!(response.into_text(), Err(BackendError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_prompt_block_reason_is_blocked() {
        let response = parse(json!({
            "promptFeedback": {"blockReason": "OTHER"}
        }));
        assert!(matches!(response.into_text(), Err(BackendError::Blocked(r)) if r == "OTHER"));
    }

    #[test]
    fn test_empty_stop_is_empty_content() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "STOP"}]
        }));
        assert!(matches!(response.into_text(), Err(BackendError::EmptyContent)));
    }

    #[tokio::test]
    async fn test_generate_joins_parts_and_sends_max_tokens() {
        let text = client(stub().await, "g-test").generate("analyze").await.unwrap();
        assert_eq!(text, "**🚨 Severity:** LOW (max_tokens=2000)");
    }

    #[tokio::test]
    async fn test_probe_succeeds_with_valid_key() {
        assert!(client(stub().await, "g-test").probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_key_surfaces_api_message() {
        let err = client(stub().await, "wrong").generate("analyze").await.unwrap_err();
        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(client(stub().await, "wrong").probe().await.is_err());
    }
}
