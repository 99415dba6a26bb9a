use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::cors::build_cors_layer;
use super::handlers::{agent_chat, agent_run, completion_run, health_check, AgentState, CompletionState};
use crate::config::BridgeConfig;

/// Routes for completion mode: `POST /` and `GET /health`.
pub fn build_completion_router(state: CompletionState, config: &BridgeConfig) -> Router {
    Router::new()
        .route("/", post(completion_run))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// Routes for agent mode: `POST /`, `POST /chat` and `GET /health`.
pub fn build_agent_router(state: AgentState, config: &BridgeConfig) -> Router {
    Router::new()
        .route("/", post(agent_run))
        .route("/chat", post(agent_chat))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
}
