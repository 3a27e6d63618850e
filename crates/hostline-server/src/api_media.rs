//! Carrier media-stream WebSocket endpoint: frame types, the active-session
//! registry, and the upgrade handler.
//!
//! The carrier speaks JSON text frames dispatched on an `event` field, with
//! audio carried as base64 payloads inside `media` frames. Frames we do not
//! model decode to [`CarrierFrame::Unknown`] and are skipped.

use crate::{bridge, AppState};
use axum::{
    extract::{Extension, WebSocketUpgrade},
    response::IntoResponse,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// One decoded inbound carrier frame.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum CarrierFrame {
    /// Socket-level hello, sent before `start`. Carries nothing we need.
    Connected,
    /// Stream metadata; the first frame that identifies the call.
    Start {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        start: StartInfo,
    },
    /// One chunk of caller audio.
    Media {
        media: MediaPayload,
    },
    /// Playback checkpoint acknowledgment. Informational.
    Mark,
    /// The carrier is done; the call ended on the telephony side.
    Stop,
    #[serde(other)]
    Unknown,
}

/// Metadata nested inside the `start` frame.
#[derive(Debug, Deserialize)]
pub struct StartInfo {
    #[serde(rename = "callSid")]
    pub call_sid: String,
    #[serde(default, rename = "customParameters")]
    pub custom_parameters: HashMap<String, String>,
}

/// The audio payload nested inside a `media` frame.
#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded mulaw audio.
    pub payload: String,
}

/// Builds an outbound `media` frame carrying agent audio to the caller.
pub fn media_frame(stream_sid: &str, payload_b64: &str) -> String {
    serde_json::json!({
        "event": "media",
        "streamSid": stream_sid,
        "media": { "payload": payload_b64 }
    })
    .to_string()
}

/// Builds an outbound `clear` frame, discarding any audio the carrier has
/// queued for playback. Sent on barge-in so the agent stops talking over
/// the caller.
pub fn clear_frame(stream_sid: &str) -> String {
    serde_json::json!({
        "event": "clear",
        "streamSid": stream_sid
    })
    .to_string()
}

/// Tracks which calls currently have a live media stream.
///
/// Uses `std::sync::RwLock` intentionally: all lock acquisitions are brief
/// HashMap operations (get/insert/remove) that never span `.await` points,
/// making a synchronous lock safe and more efficient than `tokio::sync::RwLock`.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, ActiveSession>>>,
}

/// Registry entry for one live call.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub stream_sid: String,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session for a call, replacing any previous entry.
    /// Returns false when an entry for this call was already present.
    pub fn register(&self, call_sid: &str, stream_sid: &str) -> bool {
        let mut sessions = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let previous = sessions.insert(
            call_sid.to_string(),
            ActiveSession {
                stream_sid: stream_sid.to_string(),
            },
        );
        previous.is_none()
    }

    /// Removes the session for a call, but only when the registered stream
    /// is still this one. After a duplicate stream replaced the entry, the
    /// replaced session's teardown must leave the live entry alone. Safe to
    /// call more than once.
    pub fn deregister(&self, call_sid: &str, stream_sid: &str) {
        let mut sessions = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if sessions
            .get(call_sid)
            .is_some_and(|s| s.stream_sid == stream_sid)
        {
            sessions.remove(call_sid);
        }
    }

    pub fn contains(&self, call_sid: &str) -> bool {
        let sessions = self.inner.read().unwrap_or_else(|e| e.into_inner());
        sessions.contains_key(call_sid)
    }

    pub fn active_count(&self) -> usize {
        let sessions = self.inner.read().unwrap_or_else(|e| e.into_inner());
        sessions.len()
    }
}

/// WebSocket handler: `GET /media`. The carrier dials this for every call
/// the voice webhook routed to us.
pub async fn media_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| bridge::drive_session(socket, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_frame_decodes_call_and_stream_sids() {
        let frame: CarrierFrame = serde_json::from_str(
            r#"{"event":"start","sequenceNumber":"1","streamSid":"MZ123",
                "start":{"callSid":"CA123","streamSid":"MZ123",
                         "mediaFormat":{"encoding":"audio/x-mulaw","sampleRate":8000},
                         "customParameters":{"note":"x"}}}"#,
        )
        .expect("decode");
        match frame {
            CarrierFrame::Start { stream_sid, start } => {
                assert_eq!(stream_sid, "MZ123");
                assert_eq!(start.call_sid, "CA123");
                assert_eq!(start.custom_parameters.get("note").map(String::as_str), Some("x"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn media_frame_decodes_payload() {
        let frame: CarrierFrame = serde_json::from_str(
            r#"{"event":"media","streamSid":"MZ123","media":{"track":"inbound","chunk":"2","payload":"AAAA"}}"#,
        )
        .expect("decode");
        match frame {
            CarrierFrame::Media { media } => assert_eq!(media.payload, "AAAA"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn unrecognized_event_decodes_to_unknown() {
        let frame: CarrierFrame =
            serde_json::from_str(r#"{"event":"dtmf","digit":"5"}"#).expect("decode");
        assert!(matches!(frame, CarrierFrame::Unknown));
    }

    #[test]
    fn outbound_frames_carry_the_stream_sid() {
        let media: serde_json::Value =
            serde_json::from_str(&media_frame("MZ9", "UExBWQ==")).expect("parse");
        assert_eq!(media["event"], "media");
        assert_eq!(media["streamSid"], "MZ9");
        assert_eq!(media["media"]["payload"], "UExBWQ==");

        let clear: serde_json::Value = serde_json::from_str(&clear_frame("MZ9")).expect("parse");
        assert_eq!(clear["event"], "clear");
        assert_eq!(clear["streamSid"], "MZ9");
    }

    #[test]
    fn registry_tracks_register_and_deregister() {
        let registry = SessionRegistry::new();
        assert!(registry.register("CA1", "MZ1"));
        assert!(registry.contains("CA1"));
        assert_eq!(registry.active_count(), 1);

        registry.deregister("CA1", "MZ1");
        registry.deregister("CA1", "MZ1");
        assert!(!registry.contains("CA1"));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn replaced_session_teardown_leaves_the_live_entry() {
        let registry = SessionRegistry::new();
        assert!(registry.register("CA1", "MZ1"));
        // A second stream for the same call replaces the first.
        assert!(!registry.register("CA1", "MZ2"));
        assert_eq!(registry.active_count(), 1);

        // The replaced stream tears down; the live entry must survive.
        registry.deregister("CA1", "MZ1");
        assert!(registry.contains("CA1"));

        registry.deregister("CA1", "MZ2");
        assert!(!registry.contains("CA1"));
    }
}
