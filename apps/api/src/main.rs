mod config;
mod discord;
mod errors;
mod formatter;
mod health;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::discord::DiscordNotifier;
use crate::formatter::{AlertFormatter, PromptTemplate, RetryPolicy};
use crate::health::{spawn_health_checker, HealthState};
use crate::llm_client::build_http_client;
use crate::llm_client::registry::ProviderRegistry;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; a missing primary-provider credential stops startup here.
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},tower_http={level}",
                env!("CARGO_CRATE_NAME"),
                level = config.log_level
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SRE alert API v{}", env!("CARGO_PKG_VERSION"));

    // Template problems are fatal: they would fail every request.
    let template = match &config.prompt_template_path {
        Some(path) => PromptTemplate::from_file(path)?,
        None => PromptTemplate::builtin()?,
    };
    info!("Prompt template validated");

    let http = build_http_client(config.backend_timeout).context("failed to build HTTP client")?;

    let registry = Arc::new(ProviderRegistry::from_config(&config, &http));
    let chain = registry.chain(config.ai_model_provider, &config.fallback_providers);
    let formatter = AlertFormatter::new(
        template,
        chain,
        RetryPolicy::with_timeout(config.backend_timeout),
    )?;
    info!(
        "Using AI provider: {} with model: {}",
        formatter.primary().provider,
        formatter.primary().model
    );

    let notifier = config
        .discord_webhook_url
        .clone()
        .map(|url| DiscordNotifier::new(http.clone(), url));
    if notifier.is_none() {
        info!("DISCORD_WEBHOOK_URL not set; analyses are returned to the caller only");
    }

    let health = Arc::new(RwLock::new(HealthState::unknown(formatter.primary())));
    spawn_health_checker(
        health.clone(),
        registry.clone(),
        config.health_check_interval,
        config.backend_timeout,
    );

    let state = AppState {
        formatter: Arc::new(formatter),
        registry,
        health,
        notifier,
        probe_timeout: config.backend_timeout,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // Without a signal handler, keep serving until the process is killed.
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}
