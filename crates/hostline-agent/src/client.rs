//! Outbound connection to the cloud voice-agent socket.

use crate::error::AgentError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type AgentStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the agent WebSocket with the API key as a bearer token.
///
/// Connection failures are returned, not retried: a call that cannot reach
/// the agent is torn down by the carrier side, and the next call dials
/// fresh.
pub async fn connect(endpoint: &str, api_key: &str) -> Result<AgentStream, AgentError> {
    let mut request = endpoint.into_client_request()?;
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Token {}", api_key))?,
    );
    let (stream, response) = connect_async(request).await?;
    tracing::debug!(status = %response.status(), "agent socket established");
    Ok(stream)
}
