//! LLM Client: every call to a text-generation provider goes through this module.
//!
//! Each provider implements `TextGenerator`. Providers are built by the factory in
//! `registry` from `Config`, and the formatter only ever sees the trait object.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod registry;

/// Output cap for analysis requests, on providers that accept one.
pub const MAX_TOKENS: u32 = 2000;
/// Output cap for credential probes.
pub const PROBE_MAX_TOKENS: u32 = 10;
pub(crate) const PROBE_PROMPT: &str = "test";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    OpenAi,
    Gemini,
    Ollama,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Ollama,
        Provider::Claude,
        Provider::OpenAi,
        Provider::Gemini,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Claude => "claude-3-haiku-20240307",
            Provider::OpenAi => "gpt-3.5-turbo",
            Provider::Gemini => "gemini-2.5-flash",
            Provider::Ollama => "qwen2:0.5b",
        }
    }

    /// Providers tried, in order, when this one is primary and fails.
    pub fn default_fallbacks(self) -> Vec<Provider> {
        match self {
            Provider::Claude => vec![Provider::OpenAi, Provider::Gemini, Provider::Ollama],
            Provider::OpenAi => vec![Provider::Claude, Provider::Gemini, Provider::Ollama],
            Provider::Gemini => vec![Provider::Claude, Provider::OpenAi, Provider::Ollama],
            Provider::Ollama => vec![Provider::Claude, Provider::OpenAi, Provider::Gemini],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unsupported provider '{0}'. Supported providers: claude, openai, gemini, ollama")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Provider::Claude),
            "openai" => Ok(Provider::OpenAi),
            "gemini" | "google" => Ok(Provider::Gemini),
            "ollama" => Ok(Provider::Ollama),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{provider} is not configured: {missing} is not set")]
    NotConfigured {
        provider: Provider,
        missing: &'static str,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("backend returned empty content")]
    EmptyContent,

    #[error("content generation blocked: {0}")]
    Blocked(String),
}

impl BackendError {
    /// Whether a second attempt against the same provider is worth making.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Http(_) | BackendError::Timeout(_) | BackendError::EmptyContent => true,
            BackendError::Api { status, .. } => *status == 429 || *status >= 500,
            BackendError::NotConfigured { .. } | BackendError::Blocked(_) => false,
        }
    }
}

/// The text-generation capability the formatter depends on.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    /// Cheap reachability and credential check. Defaults to a one-word generation.
    async fn probe(&self) -> Result<(), BackendError> {
        self.generate(PROBE_PROMPT).await.map(|_| ())
    }
}

/// A provider bound to a model, ready to generate.
#[derive(Clone)]
pub struct Backend {
    pub provider: Provider,
    pub model: String,
    generator: Arc<dyn TextGenerator>,
}

impl Backend {
    pub fn new(
        provider: Provider,
        model: impl Into<String>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            generator,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.generator.generate(prompt).await
    }

    pub async fn probe(&self) -> Result<(), BackendError> {
        self.generator.probe().await
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Shared HTTP client for all providers and the webhook notifier.
pub fn build_http_client(timeout: Duration) -> Result<Client, BackendError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: NestedError },
    Flat { error: String },
}

#[derive(Deserialize)]
struct NestedError {
    message: String,
}

/// Builds an `Api` error from a non-success response, pulling the provider's
/// message out of `{"error":{"message":..}}` or `{"error":".."}` when present.
pub(crate) async fn api_error(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Api {
        status,
        message: error_message(&body),
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Nested { error }) => error.message,
        Ok(ErrorBody::Flat { error }) => error,
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted generators for formatter, health and router tests.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    pub enum Step {
        Reply(String),
        Status(u16),
        Empty,
        Hang,
    }

    /// Plays back `steps` in order; the last step repeats forever.
    pub struct ScriptedGenerator {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        pub fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn replying(text: &str) -> Arc<Self> {
            Self::new(vec![Step::Reply(text.to_string())])
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_step(&self) -> Step {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front().unwrap()
            } else {
                steps.front().cloned().unwrap_or(Step::Empty)
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.next_step() {
                Step::Reply(text) => Ok(text),
                Step::Status(status) => Err(BackendError::Api {
                    status,
                    message: format!("scripted {status}"),
                }),
                Step::Empty => Err(BackendError::EmptyContent),
                Step::Hang => std::future::pending().await,
            }
        }
    }

    pub fn backend(provider: Provider, generator: Arc<ScriptedGenerator>) -> Backend {
        Backend::new(provider, provider.default_model(), generator)
    }

    /// Serves `router` on an ephemeral local port and returns its base URL.
    pub async fn spawn_stub(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }
}
