//! Provider factory: builds one `Backend` per configured provider and
//! assembles the primary→fallback chain the formatter walks.

use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::config::Config;
use crate::llm_client::anthropic::AnthropicClient;
use crate::llm_client::gemini::GeminiClient;
use crate::llm_client::ollama::OllamaClient;
use crate::llm_client::openai::OpenAiClient;
use crate::llm_client::{Backend, BackendError, Provider};

/// One slot per known provider; `backend` is an error when credentials are missing.
pub struct ProviderSlot {
    pub provider: Provider,
    pub backend: Result<Backend, BackendError>,
}

/// Every known provider, configured or not.
pub struct ProviderRegistry {
    slots: Vec<ProviderSlot>,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config, http: &Client) -> Self {
        let slots = Provider::ALL
            .into_iter()
            .map(|provider| ProviderSlot {
                provider,
                backend: create_backend(provider, config.model_for(provider), config, http),
            })
            .collect();
        Self { slots }
    }

    /// Registry over pre-built backends; providers not listed are reported unconfigured.
    #[cfg(test)]
    pub fn from_backends(backends: Vec<Backend>) -> Self {
        let slots = Provider::ALL
            .into_iter()
            .map(|provider| ProviderSlot {
                provider,
                backend: backends
                    .iter()
                    .find(|b| b.provider == provider)
                    .cloned()
                    .ok_or(BackendError::NotConfigured {
                        provider,
                        missing: "test backend",
                    }),
            })
            .collect();
        Self { slots }
    }

    pub fn slots(&self) -> &[ProviderSlot] {
        &self.slots
    }

    pub fn backend(&self, provider: Provider) -> Option<&Backend> {
        self.slots
            .iter()
            .find(|s| s.provider == provider)
            .and_then(|s| s.backend.as_ref().ok())
    }

    /// The primary followed by each configured fallback; unconfigured ones are skipped.
    pub fn chain(&self, primary: Provider, fallbacks: &[Provider]) -> Vec<Backend> {
        std::iter::once(primary)
            .chain(fallbacks.iter().copied())
            .filter_map(|provider| match self.backend(provider) {
                Some(backend) => Some(backend.clone()),
                None => {
                    info!("Skipping provider {provider}: not configured");
                    None
                }
            })
            .collect()
    }
}

pub fn create_backend(
    provider: Provider,
    model: String,
    config: &Config,
    http: &Client,
) -> Result<Backend, BackendError> {
    let creds = &config.credentials;
    let not_configured = |missing| BackendError::NotConfigured { provider, missing };

    let backend = match provider {
        Provider::Claude => {
            let key = creds
                .anthropic_api_key
                .clone()
                .ok_or_else(|| not_configured("ANTHROPIC_API_KEY"))?;
            Backend::new(
                provider,
                model.clone(),
                Arc::new(AnthropicClient::new(http.clone(), key, model)),
            )
        }
        Provider::OpenAi => {
            let key = creds
                .openai_api_key
                .clone()
                .ok_or_else(|| not_configured("OPENAI_API_KEY"))?;
            Backend::new(
                provider,
                model.clone(),
                Arc::new(OpenAiClient::new(http.clone(), key, model)),
            )
        }
        Provider::Gemini => {
            let key = creds
                .google_api_key
                .clone()
                .ok_or_else(|| not_configured("GOOGLE_API_KEY"))?;
            Backend::new(
                provider,
                model.clone(),
                Arc::new(GeminiClient::new(http.clone(), key, model)),
            )
        }
        Provider::Ollama => {
            let base_url = creds
                .ollama_base_url
                .as_deref()
                .ok_or_else(|| not_configured("OLLAMA_BASE_URL"))?;
            Backend::new(
                provider,
                model.clone(),
                Arc::new(OllamaClient::new(http.clone(), base_url, model)),
            )
        }
    };
    Ok(backend)
}
