use thiserror::Error;

/// Errors from the agent socket layer.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid agent API key: not a valid header value")]
    InvalidApiKey(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),

    #[error("failed to serialize outbound agent message: {0}")]
    Serialize(#[from] serde_json::Error),
}
