//! Hostline server library logic.

pub mod api_media;
pub mod api_ops;
pub mod api_webhook;
pub mod bridge;
pub mod config;
pub mod reconcile;

use api_media::SessionRegistry;
use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use hostline_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// WebSocket endpoint of the cloud voice agent.
    pub agent_endpoint: String,
    /// API key for the voice agent.
    pub agent_api_key: String,
    /// Public base URL the telephony carrier can reach.
    pub public_url: String,
    /// Calls with a live media stream.
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(pool: DbPool, agent_endpoint: String, agent_api_key: String, public_url: String) -> Self {
        Self {
            pool,
            agent_endpoint,
            agent_api_key,
            public_url,
            sessions: SessionRegistry::new(),
        }
    }
}

/// Health check handler.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_calls": state.sessions.active_count(),
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/voice", post(api_webhook::voice_webhook_handler))
        .route("/media", get(api_media::media_handler))
        .route("/api/calls", get(api_ops::list_calls_handler))
        .route("/api/calls/{callSid}", get(api_ops::get_call_handler))
        .route("/api/orders", get(api_ops::list_orders_handler))
        .route("/api/reservations", get(api_ops::list_reservations_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
