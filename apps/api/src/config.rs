use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::Provider;

const DEFAULT_OLLAMA_BASE_URL: &str = "http://ollama-service.ollama.svc.cluster.local:5000";

/// Credentials and endpoints for every provider the service may fall back to.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub ollama_base_url: Option<String>,
}

impl ProviderCredentials {
    /// Name of the variable that must be set for `provider`, if it is not.
    pub fn missing_for(&self, provider: Provider) -> Option<&'static str> {
        let (value, var) = match provider {
            Provider::Claude => (&self.anthropic_api_key, "ANTHROPIC_API_KEY"),
            Provider::OpenAi => (&self.openai_api_key, "OPENAI_API_KEY"),
            Provider::Gemini => (&self.google_api_key, "GOOGLE_API_KEY"),
            Provider::Ollama => (&self.ollama_base_url, "OLLAMA_BASE_URL"),
        };
        value.is_none().then_some(var)
    }
}

/// Application configuration, resolved once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub ai_model_provider: Provider,
    pub ai_model_name: String,
    pub fallback_providers: Vec<Provider>,
    pub credentials: ProviderCredentials,
    pub discord_webhook_url: Option<String>,
    pub prompt_template_path: Option<PathBuf>,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub health_check_interval: Duration,
    pub backend_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Empty values count as unset.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ai_model_provider: Provider = get("AI_MODEL_PROVIDER")
            .as_deref()
            .unwrap_or("ollama")
            .parse()?;

        let ai_model_name = get("AI_MODEL_NAME")
            .unwrap_or_else(|| ai_model_provider.default_model().to_string());

        let fallback_providers = match var("AI_FALLBACK_PROVIDERS") {
            Some(list) => parse_provider_list(&list)?
                .into_iter()
                .filter(|p| *p != ai_model_provider)
                .collect(),
            None => ai_model_provider.default_fallbacks(),
        };

        let credentials = ProviderCredentials {
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            google_api_key: get("GOOGLE_API_KEY"),
            ollama_base_url: Some(
                get("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            ),
        };

        let config = Config {
            ai_model_provider,
            ai_model_name,
            fallback_providers,
            credentials,
            discord_webhook_url: get("DISCORD_WEBHOOK_URL"),
            prompt_template_path: get("PROMPT_TEMPLATE_PATH").map(PathBuf::from),
            log_level: normalize_log_level(get("LOG_LEVEL").as_deref().unwrap_or("info")),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: get("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            health_check_interval: Duration::from_secs(parse_secs(
                get("HEALTH_CHECK_INTERVAL"),
                "HEALTH_CHECK_INTERVAL",
                30,
            )?),
            backend_timeout: Duration::from_secs(parse_secs(
                get("BACKEND_TIMEOUT_SECS"),
                "BACKEND_TIMEOUT_SECS",
                30,
            )?),
        };

        config.validate_provider_config()?;
        Ok(config)
    }

    /// The primary provider must be usable; fallbacks may be left unconfigured.
    pub fn validate_provider_config(&self) -> Result<()> {
        if let Some(var) = self.credentials.missing_for(self.ai_model_provider) {
            bail!(
                "{var} is required when using the {} provider",
                self.ai_model_provider
            );
        }
        Ok(())
    }

    /// Model for `provider`: the configured model for the primary, defaults otherwise.
    pub fn model_for(&self, provider: Provider) -> String {
        if provider == self.ai_model_provider {
            self.ai_model_name.clone()
        } else {
            provider.default_model().to_string()
        }
    }
}

fn parse_provider_list(list: &str) -> Result<Vec<Provider>> {
    let mut providers = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let provider: Provider = name
            .parse()
            .context("AI_FALLBACK_PROVIDERS contains an unknown provider")?;
        if !providers.contains(&provider) {
            providers.push(provider);
        }
    }
    Ok(providers)
}

fn parse_secs(value: Option<String>, key: &str, default: u64) -> Result<u64> {
    let secs = match value {
        Some(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds"))?,
        None => default,
    };
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(secs)
}

/// Accepts Python-style level names (`WARNING`, `CRITICAL`) as well as tracing's.
fn normalize_log_level(level: &str) -> String {
    match level.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}
