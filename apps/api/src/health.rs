//! Provider health: a cached snapshot for `/health`, refreshed in the background.
//!
//! Probing makes a real (tiny) generation call per configured provider, so the
//! snapshot is refreshed on an interval instead of on every `/health` hit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::llm_client::registry::ProviderRegistry;
use crate::llm_client::{Backend, BackendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Unknown,
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub available: bool,
    pub credentials_valid: bool,
    pub model: Option<String>,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthState {
    pub status: HealthStatus,
    pub current_provider: String,
    pub current_model: String,
    pub ready_providers: usize,
    pub total_providers: usize,
    pub provider_details: BTreeMap<String, ProviderStatus>,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl HealthState {
    pub fn unknown(primary: &Backend) -> Self {
        Self {
            status: HealthStatus::Unknown,
            current_provider: primary.provider.to_string(),
            current_model: primary.model.clone(),
            ready_providers: 0,
            total_providers: 0,
            provider_details: BTreeMap::new(),
            last_updated: None,
            error: None,
        }
    }

    /// Folds a fresh set of provider statuses into this snapshot.
    pub fn apply(&mut self, details: BTreeMap<String, ProviderStatus>) {
        let available = details.values().filter(|s| s.available).count();
        let ready = details.values().filter(|s| s.ready).count();

        self.status = if available == 0 {
            HealthStatus::Unhealthy
        } else if ready > 0 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        self.error = (available == 0).then(|| "no AI provider is configured".to_string());
        self.ready_providers = ready;
        self.total_providers = details.len();
        self.provider_details = details;
        self.last_updated = Some(Utc::now());
    }
}

pub type SharedHealth = Arc<RwLock<HealthState>>;

/// Probes every known provider, each bounded by `timeout`.
pub async fn provider_status(
    registry: &ProviderRegistry,
    timeout: Duration,
) -> BTreeMap<String, ProviderStatus> {
    let mut details = BTreeMap::new();

    for slot in registry.slots() {
        let status = match &slot.backend {
            Ok(backend) => {
                let probe = tokio::time::timeout(timeout, backend.probe())
                    .await
                    .unwrap_or(Err(BackendError::Timeout(timeout)));
                match probe {
                    Ok(()) => ProviderStatus {
                        available: true,
                        credentials_valid: true,
                        model: Some(backend.model.clone()),
                        ready: true,
                        error: None,
                    },
                    Err(e) => {
                        warn!("Provider {} validation failed: {e}", slot.provider);
                        ProviderStatus {
                            available: true,
                            credentials_valid: false,
                            model: Some(backend.model.clone()),
                            ready: false,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
            Err(e) => ProviderStatus {
                available: false,
                credentials_valid: false,
                model: None,
                ready: false,
                error: Some(e.to_string()),
            },
        };
        details.insert(slot.provider.to_string(), status);
    }

    details
}

pub async fn refresh(health: &SharedHealth, registry: &ProviderRegistry, timeout: Duration) {
    let details = provider_status(registry, timeout).await;
    let mut state = health.write().await;
    state.apply(details);
    debug!(
        "Provider health refreshed: {:?} ({}/{} ready)",
        state.status, state.ready_providers, state.total_providers
    );
}

/// Spawns the background refresher. The first refresh runs immediately.
pub fn spawn_health_checker(
    health: SharedHealth,
    registry: Arc<ProviderRegistry>,
    interval: Duration,
    probe_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            refresh(&health, &registry, probe_timeout).await;
        }
    })
}
