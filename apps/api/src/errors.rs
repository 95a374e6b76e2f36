use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::discord::NotifyError;
use crate::formatter::FormatterError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Formatter error: {0}")]
    Formatter(#[from] FormatterError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotifyError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Formatter(e) => {
                tracing::error!("Formatter error: {e}");
                (StatusCode::BAD_GATEWAY, "FORMATTER_ERROR", e.to_string())
            }
            AppError::Notification(e) => {
                tracing::error!("Notification error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "NOTIFICATION_ERROR",
                    "Failed to send message to Discord".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let AppError::Formatter(e) = &self {
            error["providers_tried"] = json!(e.providers_tried());
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{BackendError, Provider};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_is_400() {
        let response =
            AppError::Validation("Request body must be valid JSON".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Request body must be valid JSON");
    }

    #[tokio::test]
    async fn test_formatter_failure_is_502_with_providers() {
        let err = FormatterError::AllProvidersFailed {
            providers_tried: vec![Provider::Claude, Provider::Ollama],
            last_error: BackendError::EmptyContent,
        };
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "FORMATTER_ERROR");
        assert_eq!(body["error"]["providers_tried"], json!(["claude", "ollama"]));
    }
}
