use std::sync::Arc;
use std::time::Duration;

use crate::discord::DiscordNotifier;
use crate::formatter::AlertFormatter;
use crate::health::SharedHealth;
use crate::llm_client::registry::ProviderRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub formatter: Arc<AlertFormatter>,
    /// Every known provider, for `/status` live probes.
    pub registry: Arc<ProviderRegistry>,
    /// Cached provider health, written only by the background checker.
    pub health: SharedHealth,
    /// `None` when `DISCORD_WEBHOOK_URL` is unset.
    pub notifier: Option<DiscordNotifier>,
    pub probe_timeout: Duration,
}
