//! Alert analysis pipeline.
//!
//! Flow: render → invoke (per provider: up to `attempts_per_backend` tries, each
//! bounded by `timeout`; then the next provider in the chain) → validate.
//!
//! Only backend failures can fail a request. Format problems come back as
//! warnings next to the text so the on-call engineer still gets the analysis.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::formatter::template::{PromptTemplate, RenderedPrompt};
use crate::formatter::validate::{validate_response, PartialFormatWarning};
use crate::formatter::AlertData;
use crate::llm_client::{Backend, BackendError, Provider};

#[derive(Debug, Error)]
pub enum FormatterError {
    #[error("no AI provider is configured")]
    NoBackends,

    #[error("All AI providers failed. Last error: {last_error}")]
    AllProvidersFailed {
        providers_tried: Vec<Provider>,
        #[source]
        last_error: BackendError,
    },
}

impl FormatterError {
    pub fn providers_tried(&self) -> &[Provider] {
        match self {
            FormatterError::NoBackends => &[],
            FormatterError::AllProvidersFailed {
                providers_tried, ..
            } => providers_tried,
        }
    }
}

/// Bounds on each backend call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Tries per provider before moving to the next one. 2 = one retry.
    pub attempts_per_backend: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            attempts_per_backend: 2,
            timeout,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Raw backend answer plus which provider produced it.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub text: String,
    pub provider: Provider,
    pub model: String,
    pub fallback_used: bool,
}

/// What the caller gets back for one alert.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub analysis: String,
    pub warnings: Vec<PartialFormatWarning>,
    pub provider: Provider,
    pub model: String,
    pub fallback_used: bool,
}

pub struct AlertFormatter {
    template: PromptTemplate,
    backends: Vec<Backend>,
    policy: RetryPolicy,
}

impl AlertFormatter {
    /// `backends[0]` is the primary provider; the rest are fallbacks in order.
    pub fn new(
        template: PromptTemplate,
        backends: Vec<Backend>,
        policy: RetryPolicy,
    ) -> Result<Self, FormatterError> {
        if backends.is_empty() {
            return Err(FormatterError::NoBackends);
        }
        Ok(Self {
            template,
            backends,
            policy,
        })
    }

    pub fn primary(&self) -> &Backend {
        &self.backends[0]
    }

    pub fn render(&self, alert: &AlertData) -> RenderedPrompt {
        self.template.render(alert)
    }

    pub async fn analyze(&self, alert: &AlertData) -> Result<AnalysisResult, FormatterError> {
        let prompt = self.render(alert);
        let invocation = self.invoke(&prompt).await?;

        let validated = validate_response(&invocation.text);
        if !validated.is_clean() {
            warn!(
                "Analysis from {} is partially formatted: {:?}",
                invocation.provider, validated.warnings
            );
        }

        Ok(AnalysisResult {
            analysis: validated.text,
            warnings: validated.warnings,
            provider: invocation.provider,
            model: invocation.model,
            fallback_used: invocation.fallback_used,
        })
    }

    /// Walks the provider chain until one answers.
    pub async fn invoke(&self, prompt: &RenderedPrompt) -> Result<Invocation, FormatterError> {
        let mut providers_tried = Vec::with_capacity(self.backends.len());
        let mut last_error = None;

        for (index, backend) in self.backends.iter().enumerate() {
            providers_tried.push(backend.provider);
            info!("Attempting analysis with provider: {}", backend.provider);

            match self.invoke_backend(backend, prompt).await {
                Ok(text) => {
                    info!("Analysis successful with provider: {}", backend.provider);
                    return Ok(Invocation {
                        text,
                        provider: backend.provider,
                        model: backend.model.clone(),
                        fallback_used: index > 0,
                    });
                }
                Err(e) => {
                    error!("Provider {} failed: {e}", backend.provider);
                    last_error = Some(e);
                }
            }
        }

        error!("All AI providers failed");
        match last_error {
            Some(last_error) => Err(FormatterError::AllProvidersFailed {
                providers_tried,
                last_error,
            }),
            None => Err(FormatterError::NoBackends),
        }
    }

    async fn invoke_backend(
        &self,
        backend: &Backend,
        prompt: &RenderedPrompt,
    ) -> Result<String, BackendError> {
        let attempts = self.policy.attempts_per_backend.max(1);
        let mut attempt = 1;
        loop {
            let call = backend.generate(prompt.as_str());
            let result = tokio::time::timeout(self.policy.timeout, call)
                .await
                .unwrap_or(Err(BackendError::Timeout(self.policy.timeout)));

            let err = match result {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if attempt >= attempts || !err.is_retryable() {
                return Err(err);
            }

            warn!(
                "{} attempt {}/{} failed ({err}), retrying after {}ms...",
                backend.provider,
                attempt,
                attempts,
                self.policy.backoff.as_millis()
            );
            tokio::time::sleep(self.policy.backoff).await;
            attempt += 1;
        }
    }
}
