//! The call bridge session: one per live phone call, relaying audio between
//! the carrier media stream and the cloud voice agent while observing
//! transcripts and tool calls.
//!
//! The lifecycle logic lives in [`BridgeCore`], a pure state machine with no
//! socket or database dependency, so buffering, flush ordering, and the
//! idempotent close can be tested without I/O. [`drive_session`] wires the
//! core to the two sockets and the store.

use crate::api_media::{clear_frame, media_frame, CarrierFrame};
use crate::AppState;
use axum::extract::ws::{Message as CarrierMessage, WebSocket};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use hostline_agent::{
    AgentEvent, AgentStream, FunctionCallResponse, SettingsMessage,
};
use hostline_store::{
    fetch_active_catalog, guardrail_prompt, insert_call_event, insert_transcript_turn,
    CATALOG_UNAVAILABLE_FALLBACK,
};
use hostline_types::{CatalogItem, StructuredOutcome, TranscriptTurn, TurnRole};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as AgentMessage;

/// Maximum caller-audio chunks held while awaiting the settings handshake.
/// At 20 ms per carrier chunk this is about five seconds of speech.
pub const AUDIO_BUFFER_CHUNKS: usize = 256;

/// Lifecycle phase of one bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    /// Carrier socket open, waiting for the `start` frame.
    Connecting,
    /// Agent socket dialed, waiting for its `Welcome`.
    AwaitingHandshake,
    /// Settings sent, holding caller audio until `SettingsApplied`.
    Buffering,
    /// Full-duplex audio relay.
    Streaming,
    /// Teardown started; no further audio moves.
    Closing,
    Closed,
}

/// What to do with one chunk of caller audio, decided by the current phase.
#[derive(Debug, PartialEq, Eq)]
pub enum AudioDisposition {
    /// Forward to the agent now.
    Relay(Vec<u8>),
    /// Held for the post-handshake flush.
    Buffered,
    /// Held, and the oldest buffered chunk was evicted to make room.
    BufferedEvicting,
    /// Audio is not moving in this phase.
    Ignored,
}

/// The pure session state machine.
pub struct BridgeCore {
    phase: BridgePhase,
    buffer: VecDeque<Vec<u8>>,
    dropped_chunks: u64,
    settings_sent: bool,
}

impl BridgeCore {
    pub fn new() -> Self {
        Self {
            phase: BridgePhase::Connecting,
            buffer: VecDeque::new(),
            dropped_chunks: 0,
            settings_sent: false,
        }
    }

    pub fn phase(&self) -> BridgePhase {
        self.phase
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn dropped_chunks(&self) -> u64 {
        self.dropped_chunks
    }

    /// The `start` frame arrived and the agent socket is being dialed.
    pub fn handshake_pending(&mut self) {
        if self.phase == BridgePhase::Connecting {
            self.phase = BridgePhase::AwaitingHandshake;
        }
    }

    /// Agent `Welcome`: returns true when the settings handshake should be
    /// sent. True at most once per session.
    pub fn on_welcome(&mut self) -> bool {
        if self.phase == BridgePhase::AwaitingHandshake && !self.settings_sent {
            self.settings_sent = true;
            self.phase = BridgePhase::Buffering;
            true
        } else {
            false
        }
    }

    /// Agent `SettingsApplied`: returns the buffered audio, oldest first,
    /// and moves to streaming. `None` when the event arrives out of order.
    pub fn on_settings_applied(&mut self) -> Option<Vec<Vec<u8>>> {
        if self.phase != BridgePhase::Buffering {
            return None;
        }
        self.phase = BridgePhase::Streaming;
        Some(self.buffer.drain(..).collect())
    }

    /// Routes one chunk of caller audio according to the current phase.
    /// Buffering is bounded: when full, the oldest chunk is dropped so the
    /// flush stays close to live speech.
    pub fn accept_carrier_audio(&mut self, chunk: Vec<u8>) -> AudioDisposition {
        match self.phase {
            BridgePhase::Streaming => AudioDisposition::Relay(chunk),
            BridgePhase::AwaitingHandshake | BridgePhase::Buffering => {
                let evicting = self.buffer.len() >= AUDIO_BUFFER_CHUNKS;
                if evicting {
                    self.buffer.pop_front();
                    self.dropped_chunks += 1;
                }
                self.buffer.push_back(chunk);
                if evicting {
                    AudioDisposition::BufferedEvicting
                } else {
                    AudioDisposition::Buffered
                }
            }
            BridgePhase::Connecting | BridgePhase::Closing | BridgePhase::Closed => {
                AudioDisposition::Ignored
            }
        }
    }

    /// Starts teardown. Returns true only the first time, so close frames
    /// and end-of-call persistence run exactly once no matter how many
    /// paths (carrier stop, socket error, duplicate frames) race into it.
    pub fn begin_closing(&mut self) -> bool {
        if matches!(self.phase, BridgePhase::Closing | BridgePhase::Closed) {
            false
        } else {
            self.phase = BridgePhase::Closing;
            true
        }
    }

    pub fn mark_closed(&mut self) {
        self.phase = BridgePhase::Closed;
    }
}

impl Default for BridgeCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies a transcript line: the explicit role field when it parses,
/// otherwise a keyword sniff of the content. Host-side phrasing is fairly
/// stereotyped; anything that doesn't look like it is caller speech.
pub fn classify_role(role: Option<&str>, content: &str) -> TurnRole {
    if let Some(raw) = role {
        if let Ok(parsed) = raw.to_lowercase().parse() {
            return parsed;
        }
    }
    const HOST_MARKERS: &[&str] = &[
        "thanks for calling",
        "would you like",
        "can i get",
        "anything else",
        "your order",
        "your table",
        "what time works",
    ];
    let lower = content.to_lowercase();
    if HOST_MARKERS.iter().any(|m| lower.contains(m)) {
        TurnRole::Assistant
    } else {
        TurnRole::User
    }
}

type AgentSink = SplitSink<AgentStream, AgentMessage>;

/// Mutable session context shared by the relay loop arms.
struct Session {
    state: Arc<AppState>,
    call_sid: String,
    stream_sid: String,
    caller_phone: Option<String>,
    catalog: Vec<CatalogItem>,
    turns: Vec<TranscriptTurn>,
    tool_outcome: Option<StructuredOutcome>,
    core: BridgeCore,
    carrier_tx: mpsc::Sender<String>,
}

/// Runs one carrier socket to completion. Spawned per upgrade.
pub async fn drive_session(socket: WebSocket, state: Arc<AppState>) {
    let (mut carrier_sender, mut carrier_receiver) = socket.split();

    // Bounded forward channel for frames headed back to the carrier, so the
    // agent-read arm never blocks on a slow carrier socket.
    let (carrier_tx, mut carrier_rx) = mpsc::channel::<String>(256);
    let send_task = tokio::spawn(async move {
        while let Some(msg) = carrier_rx.recv().await {
            if carrier_sender
                .send(CarrierMessage::Text(msg.into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let Some((call_sid, stream_sid)) = await_start(&mut carrier_receiver).await else {
        tracing::debug!("carrier socket closed before a start frame");
        send_task.abort();
        return;
    };

    tracing::info!(call_sid = %call_sid, stream_sid = %stream_sid, "media stream started");

    if !state.sessions.register(&call_sid, &stream_sid) {
        tracing::warn!(call_sid = %call_sid, "replacing an existing media session for this call");
    }

    let mut session = Session {
        caller_phone: lookup_caller_phone(&state, &call_sid).await,
        catalog: Vec::new(),
        turns: Vec::new(),
        tool_outcome: None,
        core: BridgeCore::new(),
        carrier_tx,
        stream_sid,
        call_sid,
        state,
    };

    log_event(
        &session.state,
        &session.call_sid,
        "stream_connected",
        serde_json::json!({ "stream_sid": session.stream_sid }),
    )
    .await;

    let guardrail = fetch_guardrail(&mut session).await;

    match hostline_agent::connect(&session.state.agent_endpoint, &session.state.agent_api_key).await
    {
        Ok(agent) => {
            session.core.handshake_pending();
            let (mut agent_sink, agent_stream) = agent.split();
            relay_loop(
                &mut session,
                &mut carrier_receiver,
                &mut agent_sink,
                agent_stream,
                &guardrail,
            )
            .await;
            finalize(&mut session, Some(&mut agent_sink)).await;
        }
        Err(e) => {
            tracing::error!(call_sid = %session.call_sid, "failed to dial the voice agent: {}", e);
            log_event(
                &session.state,
                &session.call_sid,
                "agent_connect_failed",
                serde_json::json!({ "error": e.to_string() }),
            )
            .await;
            // The carrier owns the call; consume its frames until it hangs
            // up, then tear down normally.
            drain_until_stop(&mut carrier_receiver).await;
            finalize(&mut session, None).await;
        }
    }

    send_task.abort();
}

/// Consumes carrier frames until the `start` frame identifies the call.
async fn await_start(
    carrier_receiver: &mut SplitStream<WebSocket>,
) -> Option<(String, String)> {
    while let Some(Ok(msg)) = carrier_receiver.next().await {
        let CarrierMessage::Text(text) = msg else {
            continue;
        };
        match serde_json::from_str::<CarrierFrame>(text.as_str()) {
            Ok(CarrierFrame::Start { stream_sid, start }) => {
                return Some((start.call_sid, stream_sid));
            }
            Ok(CarrierFrame::Stop) => return None,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("skipping undecodable carrier frame: {}", e);
            }
        }
    }
    None
}

/// Full-duplex relay between the two sockets. Returns when the carrier side
/// ends the call; an agent-side close only stops the agent arm, leaving the
/// session alive for the carrier teardown.
async fn relay_loop(
    session: &mut Session,
    carrier_receiver: &mut SplitStream<WebSocket>,
    agent_sink: &mut AgentSink,
    mut agent_stream: SplitStream<AgentStream>,
    guardrail: &str,
) {
    let mut agent_open = true;

    loop {
        tokio::select! {
            frame = carrier_receiver.next() => {
                match frame {
                    Some(Ok(CarrierMessage::Text(text))) => {
                        if !handle_carrier_frame(session, agent_sink, text.as_str()).await {
                            break;
                        }
                    }
                    Some(Ok(CarrierMessage::Close(_))) | None => {
                        tracing::info!(call_sid = %session.call_sid, "carrier socket closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(call_sid = %session.call_sid, "carrier socket error: {}", e);
                        break;
                    }
                }
            }
            event = agent_stream.next(), if agent_open => {
                match event {
                    Some(Ok(AgentMessage::Text(text))) => {
                        handle_agent_event(session, agent_sink, text.as_str(), guardrail).await;
                    }
                    Some(Ok(AgentMessage::Binary(audio))) => {
                        let frame = media_frame(&session.stream_sid, &BASE64.encode(&audio));
                        if let Err(e) = session.carrier_tx.try_send(frame) {
                            tracing::warn!(
                                call_sid = %session.call_sid,
                                "dropping agent audio for slow carrier socket: {}", e
                            );
                        }
                    }
                    Some(Ok(AgentMessage::Close(_))) | None => {
                        tracing::warn!(
                            call_sid = %session.call_sid,
                            "agent socket closed mid-call; awaiting carrier teardown"
                        );
                        agent_open = false;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(call_sid = %session.call_sid, "agent socket error: {}", e);
                        agent_open = false;
                    }
                }
            }
        }
    }
}

/// Handles one carrier text frame. Returns false when the call is over.
async fn handle_carrier_frame(
    session: &mut Session,
    agent_sink: &mut AgentSink,
    text: &str,
) -> bool {
    match serde_json::from_str::<CarrierFrame>(text) {
        Ok(CarrierFrame::Media { media }) => {
            let chunk = match BASE64.decode(media.payload.as_bytes()) {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(call_sid = %session.call_sid, "undecodable media payload: {}", e);
                    return true;
                }
            };
            match session.core.accept_carrier_audio(chunk) {
                AudioDisposition::Relay(bytes) => {
                    if let Err(e) = agent_sink.send(AgentMessage::Binary(bytes.into())).await {
                        tracing::warn!(call_sid = %session.call_sid, "agent audio send failed: {}", e);
                    }
                }
                AudioDisposition::BufferedEvicting => {
                    // Logged once per 100 evictions to keep the hot path quiet.
                    if session.core.dropped_chunks() % 100 == 1 {
                        tracing::warn!(
                            call_sid = %session.call_sid,
                            dropped = session.core.dropped_chunks(),
                            "audio buffer full, dropping oldest chunks"
                        );
                    }
                }
                AudioDisposition::Buffered | AudioDisposition::Ignored => {}
            }
            true
        }
        Ok(CarrierFrame::Stop) => {
            tracing::info!(call_sid = %session.call_sid, "carrier sent stop");
            false
        }
        Ok(CarrierFrame::Start { .. }) => {
            tracing::warn!(call_sid = %session.call_sid, "duplicate start frame ignored");
            true
        }
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(call_sid = %session.call_sid, "skipping undecodable carrier frame: {}", e);
            true
        }
    }
}

/// Handles one agent text event.
async fn handle_agent_event(
    session: &mut Session,
    agent_sink: &mut AgentSink,
    text: &str,
    guardrail: &str,
) {
    match AgentEvent::decode(text) {
        AgentEvent::Welcome => {
            if !session.core.on_welcome() {
                tracing::debug!(call_sid = %session.call_sid, "duplicate agent welcome ignored");
                return;
            }
            match SettingsMessage::new(guardrail).to_json() {
                Ok(json) => {
                    if let Err(e) = agent_sink.send(AgentMessage::Text(json.into())).await {
                        tracing::error!(call_sid = %session.call_sid, "settings send failed: {}", e);
                    } else {
                        tracing::info!(call_sid = %session.call_sid, "settings handshake sent");
                    }
                }
                Err(e) => {
                    tracing::error!(call_sid = %session.call_sid, "settings serialization failed: {}", e);
                }
            }
        }
        AgentEvent::SettingsApplied => {
            let Some(chunks) = session.core.on_settings_applied() else {
                tracing::debug!(call_sid = %session.call_sid, "unexpected SettingsApplied ignored");
                return;
            };
            let flushed = chunks.len();
            for chunk in chunks {
                if let Err(e) = agent_sink.send(AgentMessage::Binary(chunk.into())).await {
                    tracing::warn!(call_sid = %session.call_sid, "buffered audio flush failed: {}", e);
                    break;
                }
            }
            tracing::info!(
                call_sid = %session.call_sid,
                flushed,
                dropped = session.core.dropped_chunks(),
                "streaming started"
            );
        }
        AgentEvent::ConversationText { role, content } => {
            let role = classify_role(role.as_deref(), &content);
            session.turns.push(TranscriptTurn::new(role, content.clone()));
            persist_turn(&session.state, &session.call_sid, role, &content).await;
        }
        AgentEvent::UserStartedSpeaking => {
            // Barge-in: ask the carrier to discard queued agent audio so the
            // agent is not talking over the caller.
            if let Err(e) = session
                .carrier_tx
                .try_send(clear_frame(&session.stream_sid))
            {
                tracing::warn!(call_sid = %session.call_sid, "clear frame send failed: {}", e);
            }
        }
        AgentEvent::FunctionCallRequest { functions } => {
            for call in functions {
                handle_tool_call(session, agent_sink, call).await;
            }
        }
        AgentEvent::AgentAudioDone => {
            tracing::debug!(call_sid = %session.call_sid, "agent finished speaking");
        }
        AgentEvent::Error { description } => {
            tracing::warn!(call_sid = %session.call_sid, "agent reported an error: {}", description);
            log_event(
                &session.state,
                &session.call_sid,
                "agent_error",
                serde_json::json!({ "description": description }),
            )
            .await;
        }
        AgentEvent::Unknown => {
            tracing::debug!(call_sid = %session.call_sid, "ignoring unknown agent event");
        }
    }
}

/// Validates one requested tool invocation and, when it passes, records and
/// materializes the outcome immediately. The agent always gets a response
/// so it can keep the conversation moving.
async fn handle_tool_call(
    session: &mut Session,
    agent_sink: &mut AgentSink,
    call: hostline_agent::FunctionCall,
) {
    let reply = match hostline_agent::validate_tool_call(&call.name, &call.arguments) {
        Some(outcome) => {
            tracing::info!(call_sid = %session.call_sid, tool = %call.name, "tool call accepted");
            log_event(
                &session.state,
                &session.call_sid,
                "tool_call",
                serde_json::json!({
                    "tool": call.name,
                    "customer": outcome.customer.name,
                }),
            )
            .await;
            materialize(&session.state, &session.call_sid, session.caller_phone.as_deref(), &outcome)
                .await;
            session.tool_outcome = Some(outcome);
            "Recorded. Confirm the details back to the caller."
        }
        None => {
            tracing::warn!(call_sid = %session.call_sid, tool = %call.name, "tool call rejected");
            log_event(
                &session.state,
                &session.call_sid,
                "tool_call_rejected",
                serde_json::json!({ "tool": call.name }),
            )
            .await;
            "The details were incomplete. Ask the caller to confirm them and try again."
        }
    };

    let response = FunctionCallResponse::new(call.id.clone(), &call.name, reply);
    match serde_json::to_string(&response) {
        Ok(json) => {
            if let Err(e) = agent_sink.send(AgentMessage::Text(json.into())).await {
                tracing::warn!(call_sid = %session.call_sid, "tool response send failed: {}", e);
            }
        }
        Err(e) => {
            tracing::error!(call_sid = %session.call_sid, "tool response serialization failed: {}", e);
        }
    }
}

/// Consumes and discards carrier frames until stop or close. Used when the
/// agent leg never came up but the carrier still owns the call.
async fn drain_until_stop(carrier_receiver: &mut SplitStream<WebSocket>) {
    while let Some(Ok(msg)) = carrier_receiver.next().await {
        if let CarrierMessage::Text(text) = msg {
            if matches!(
                serde_json::from_str::<CarrierFrame>(text.as_str()),
                Ok(CarrierFrame::Stop)
            ) {
                return;
            }
        }
    }
}

/// Idempotent teardown: close the agent leg, mark the call completed, and
/// materialize the business outcome exactly once.
async fn finalize(session: &mut Session, agent_sink: Option<&mut AgentSink>) {
    if !session.core.begin_closing() {
        return;
    }

    if let Some(sink) = agent_sink {
        let _ = sink.send(AgentMessage::Close(None)).await;
    }
    session
        .state
        .sessions
        .deregister(&session.call_sid, &session.stream_sid);

    let outcome = match &session.tool_outcome {
        Some(outcome) => outcome.clone(),
        None => hostline_extract::extract_outcome(
            &session.turns,
            session.caller_phone.as_deref(),
            &session.catalog,
        ),
    };

    let pool = session.state.pool.clone();
    let call_sid = session.call_sid.clone();
    let caller_phone = session.caller_phone.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let completed =
            hostline_store::complete_call(&conn, &call_sid).map_err(|e| e.to_string())?;
        if let Err(e) = insert_call_event(
            &conn,
            &call_sid,
            "call_completed",
            &serde_json::json!({ "source": outcome.source.as_str() }),
        ) {
            tracing::warn!(call_sid = %call_sid, "call_completed event write failed: {}", e);
        }
        let report =
            hostline_store::materialize_outcome(&conn, &call_sid, caller_phone.as_deref(), &outcome)
                .map_err(|e| e.to_string())?;
        Ok::<_, String>((completed, report))
    })
    .await;

    match result {
        Ok(Ok((completed, report))) => {
            tracing::info!(
                call_sid = %session.call_sid,
                completed,
                order_created = report.order_created,
                reservation_created = report.reservation_created,
                "call torn down"
            );
        }
        Ok(Err(e)) => {
            tracing::error!(call_sid = %session.call_sid, "end-of-call persistence failed: {}", e);
        }
        Err(e) => {
            tracing::error!(call_sid = %session.call_sid, "teardown task join error: {}", e);
        }
    }

    session.core.mark_closed();
}

/// Reads the caller's number off the call row, creating the row if the
/// webhook never saw this call (a direct stream connection).
async fn lookup_caller_phone(state: &Arc<AppState>, call_sid: &str) -> Option<String> {
    let pool = state.pool.clone();
    let sid = call_sid.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        hostline_store::upsert_call(
            &conn,
            &hostline_store::UpsertCallParams {
                call_sid: sid.clone(),
                from_number: None,
                to_number: None,
            },
        )
        .map_err(|e| e.to_string())?;
        hostline_store::get_call(&conn, &sid).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(call)) => call.from_number,
        Ok(Err(e)) => {
            tracing::warn!(call_sid, "call row lookup failed: {}", e);
            None
        }
        Err(e) => {
            tracing::warn!(call_sid, "call row lookup join error: {}", e);
            None
        }
    }
}

/// Fetches the live catalog and derives the guardrail fragment. Soft-fails
/// to the static fallback: a broken catalog read must not block the call.
async fn fetch_guardrail(session: &mut Session) -> String {
    let pool = session.state.pool.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        fetch_active_catalog(&conn).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(catalog)) => {
            let prompt = guardrail_prompt(&catalog);
            session.catalog = catalog;
            prompt
        }
        Ok(Err(e)) => {
            tracing::warn!(call_sid = %session.call_sid, "catalog fetch failed, using fallback: {}", e);
            CATALOG_UNAVAILABLE_FALLBACK.to_string()
        }
        Err(e) => {
            tracing::warn!(call_sid = %session.call_sid, "catalog fetch join error: {}", e);
            CATALOG_UNAVAILABLE_FALLBACK.to_string()
        }
    }
}

/// Appends one transcript turn, swallowing write failures: losing a line of
/// transcript must not interrupt a live call.
async fn persist_turn(state: &Arc<AppState>, call_sid: &str, role: TurnRole, text: &str) {
    let pool = state.pool.clone();
    let sid = call_sid.to_string();
    let text = text.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        insert_transcript_turn(&conn, &sid, role, &text).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(call_sid, "transcript write failed: {}", e),
        Err(e) => tracing::warn!(call_sid, "transcript write join error: {}", e),
    }
}

/// Writes one row to the call event log, swallowing failures.
async fn log_event(
    state: &Arc<AppState>,
    call_sid: &str,
    event_type: &'static str,
    payload: serde_json::Value,
) {
    let pool = state.pool.clone();
    let sid = call_sid.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        insert_call_event(&conn, &sid, event_type, &payload).map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(call_sid, event_type, "event log write failed: {}", e),
        Err(e) => tracing::warn!(call_sid, event_type, "event log join error: {}", e),
    }
}

/// Persists one structured outcome, swallowing failures. The teardown path
/// retries materialization anyway (it is idempotent), so a mid-call failure
/// here still gets a second chance.
async fn materialize(
    state: &Arc<AppState>,
    call_sid: &str,
    caller_phone: Option<&str>,
    outcome: &StructuredOutcome,
) {
    let pool = state.pool.clone();
    let sid = call_sid.to_string();
    let phone = caller_phone.map(str::to_string);
    let outcome = outcome.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        hostline_store::materialize_outcome(&conn, &sid, phone.as_deref(), &outcome)
            .map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(report)) => {
            tracing::info!(
                call_sid,
                order_created = report.order_created,
                reservation_created = report.reservation_created,
                "tool outcome materialized"
            );
        }
        Ok(Err(e)) => tracing::warn!(call_sid, "mid-call materialization failed: {}", e),
        Err(e) => tracing::warn!(call_sid, "materialization join error: {}", e),
    }
}
