use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::formatter::validate::truncate_sections;
use crate::formatter::AnalysisResult;

/// Discord rejects messages whose `content` exceeds this many characters.
pub const DISCORD_CONTENT_LIMIT: usize = 2000;

const FOOTER: &str = "** Please check your application to reduce the logs**";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Discord webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Discord webhook error: {status} - {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// Relays analyses to a Discord channel webhook.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(http: Client, webhook_url: String) -> Self {
        Self { http, webhook_url }
    }

    pub async fn notify(&self, result: &AnalysisResult) -> Result<(), NotifyError> {
        let content = format_message(result);
        let response = self
            .http
            .post(&self.webhook_url)
            .json(&WebhookMessage { content: &content })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Discord webhook error: {status} - {body}");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Discord notification sent successfully");
        Ok(())
    }
}

/// Wraps the analysis in the channel header and footer, re-truncating the
/// analysis body if the whole message would not fit in one Discord post.
pub fn format_message(result: &AnalysisResult) -> String {
    let fallback_indicator = if result.fallback_used { " (FALLBACK)" } else { "" };
    let header = format!(
        "**Alert Analysis** ({}{fallback_indicator}):\n",
        result.provider
    );
    let frame_chars = header.chars().count() + 1 + FOOTER.chars().count();
    let budget = DISCORD_CONTENT_LIMIT.saturating_sub(frame_chars);
    let body = truncate_sections(&result.analysis, budget);

    format!("{header}{body}\n{FOOTER}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::spawn_stub;
    use crate::llm_client::Provider;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    fn result(analysis: &str, fallback_used: bool) -> AnalysisResult {
        AnalysisResult {
            analysis: analysis.to_string(),
            warnings: vec![],
            provider: Provider::Claude,
            model: "claude-3-haiku-20240307".to_string(),
            fallback_used,
        }
    }

    #[test]
    fn test_message_layout() {
        let message = format_message(&result("**🚨 Severity:** LOW", false));
        assert_eq!(
            message,
            "**Alert Analysis** (claude):\n**🚨 Severity:** LOW\n\
             ** Please check your application to reduce the logs**"
        );
    }

    #[test]
    fn test_fallback_is_flagged() {
        let message = format_message(&result("ok", true));
        assert!(message.starts_with("**Alert Analysis** (claude (FALLBACK)):\n"));
    }

    #[test]
    fn test_message_fits_discord_limit() {
        let message = format_message(&result(&"x".repeat(1900), true));
        assert!(message.chars().count() <= DISCORD_CONTENT_LIMIT);
        assert!(message.ends_with(FOOTER));
    }

    type Captured = Arc<Mutex<Vec<Value>>>;

    async fn webhook(State(seen): State<Captured>, Json(body): Json<Value>) -> StatusCode {
        seen.lock().unwrap().push(body);
        StatusCode::NO_CONTENT
    }

    async fn rejecting_webhook() -> (StatusCode, &'static str) {
        (StatusCode::BAD_REQUEST, "{\"content\": [\"Must be 2000 or fewer in length.\"]}")
    }

    #[tokio::test]
    async fn test_notify_posts_content() {
        let seen: Captured = Arc::default();
        let router = Router::new()
            .route("/hook", post(webhook))
            .with_state(seen.clone());
        let base = spawn_stub(router).await;

        let notifier = DiscordNotifier::new(Client::new(), format!("{base}/hook"));
        notifier.notify(&result("**🚨 Severity:** LOW", false)).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0]["content"]
            .as_str()
            .unwrap()
            .contains("**🚨 Severity:** LOW"));
    }

    #[tokio::test]
    async fn test_notify_surfaces_rejection() {
        let base = spawn_stub(Router::new().route("/hook", post(rejecting_webhook))).await;
        let notifier = DiscordNotifier::new(Client::new(), format!("{base}/hook"));

        match notifier.notify(&result("x", false)).await.unwrap_err() {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("2000 or fewer"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
