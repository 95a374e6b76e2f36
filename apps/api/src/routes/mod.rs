pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::formatter::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/live", get(health::live_handler))
        .route("/status", get(health::status_handler))
        .route("/alert", post(handlers::handle_alert))
        .with_state(state)
}
