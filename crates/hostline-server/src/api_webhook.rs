//! Inbound voice webhook: the carrier posts here when a call arrives, and
//! the response tells it to open the media stream.

use crate::AppState;
use axum::{
    extract::{Extension, Form},
    http::{header, StatusCode},
    response::IntoResponse,
};
use hostline_store::{insert_call_event, upsert_call, UpsertCallParams};
use serde::Deserialize;
use std::sync::Arc;

/// The carrier's form-encoded webhook payload. Field names follow the
/// carrier's PascalCase convention.
#[derive(Debug, Deserialize)]
pub struct VoiceWebhookForm {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
}

/// `POST /webhook/voice` — records the inbound call and answers with the
/// routing XML that connects the carrier to `/media`.
pub async fn voice_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<VoiceWebhookForm>,
) -> Result<impl IntoResponse, StatusCode> {
    if form.call_sid.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    tracing::info!(
        call_sid = %form.call_sid,
        from = form.from.as_deref().unwrap_or("<unknown>"),
        "inbound call webhook"
    );

    let pool = state.pool.clone();
    let params = UpsertCallParams {
        call_sid: form.call_sid.clone(),
        from_number: form.from.clone(),
        to_number: form.to.clone(),
    };
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        upsert_call(&conn, &params).map_err(|e| e.to_string())?;
        insert_call_event(
            &conn,
            &params.call_sid,
            "call_started",
            &serde_json::json!({ "from": params.from_number, "to": params.to_number }),
        )
        .map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(call_sid = %form.call_sid, "webhook call upsert failed: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Err(e) => {
            tracing::error!(call_sid = %form.call_sid, "webhook task join error: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    let body = connect_stream_xml(&media_stream_url(&state.public_url));
    Ok(([(header::CONTENT_TYPE, "text/xml")], body))
}

/// Derives the media-stream WebSocket URL from the public base URL.
pub fn media_stream_url(public_url: &str) -> String {
    let base = public_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/media", ws_base)
}

fn connect_stream_xml(stream_url: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Response><Connect><Stream url=\"{}\"/></Connect></Response>",
        xml_escape(stream_url)
    )
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_stream_url_flips_scheme_to_websocket() {
        assert_eq!(
            media_stream_url("https://calls.example.com"),
            "wss://calls.example.com/media"
        );
        assert_eq!(
            media_stream_url("http://localhost:3000/"),
            "ws://localhost:3000/media"
        );
        assert_eq!(
            media_stream_url("wss://already.example.com"),
            "wss://already.example.com/media"
        );
    }

    #[test]
    fn routing_xml_connects_the_stream() {
        let xml = connect_stream_xml("wss://calls.example.com/media");
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<Connect><Stream url=\"wss://calls.example.com/media\"/></Connect>"));
    }

    #[test]
    fn xml_special_characters_are_escaped() {
        let xml = connect_stream_xml("wss://h/media?a=1&b=\"x\"");
        assert!(xml.contains("a=1&amp;b=&quot;x&quot;"));
    }
}
