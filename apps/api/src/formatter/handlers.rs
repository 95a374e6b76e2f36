//! Axum route handler for incoming alerts.

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::formatter::validate::PartialFormatWarning;
use crate::formatter::AlertData;
use crate::llm_client::Provider;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub alert_id: Uuid,
    pub provider: Provider,
    pub model: String,
    pub fallback_used: bool,
    pub analysis: String,
    pub warnings: Vec<PartialFormatWarning>,
    pub notified: bool,
}

/// POST /alert
///
/// Accepts any JSON body as alert data, runs the analysis, relays it to Discord
/// when a webhook is configured, and returns the (possibly annotated) analysis.
pub async fn handle_alert(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AlertResponse>, AppError> {
    let payload: Value = serde_json::from_slice(&body)
        .ok()
        .filter(|v: &Value| !v.is_null())
        .ok_or_else(|| AppError::Validation("Request body must be valid JSON".to_string()))?;

    let alert_id = Uuid::new_v4();
    let alert = AlertData::from_json(&payload);
    info!(%alert_id, bytes = alert.as_str().len(), "Alert received");

    let result = state.formatter.analyze(&alert).await?;

    if result.fallback_used {
        warn!(%alert_id, "Primary provider failed, used fallback: {}", result.provider);
    } else {
        info!(%alert_id, "Analysis completed with primary provider: {}", result.provider);
    }

    let notified = match &state.notifier {
        Some(notifier) => {
            notifier.notify(&result).await?;
            true
        }
        None => false,
    };

    Ok(Json(AlertResponse {
        status: "success",
        message: "Alert received and processed",
        alert_id,
        provider: result.provider,
        model: result.model,
        fallback_used: result.fallback_used,
        analysis: result.analysis,
        warnings: result.warnings,
        notified,
    }))
}
