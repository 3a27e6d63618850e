//! Inbound agent events.
//!
//! The agent sends JSON text frames dispatched on a `type` field; binary
//! frames are raw synthesized audio and never reach this module. Event
//! kinds we do not model decode to [`AgentEvent::Unknown`] so a vendor-side
//! protocol addition never breaks an active call.

use serde::{Deserialize, Serialize};

/// One decoded agent event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    /// The socket is ready for the settings handshake.
    Welcome,
    /// The settings handshake was accepted; audio may now flow.
    SettingsApplied,
    /// A finalized transcript line for one side of the conversation.
    ConversationText {
        #[serde(default)]
        role: Option<String>,
        content: String,
    },
    /// The caller started talking over the agent.
    UserStartedSpeaking,
    /// The agent wants one or more tools invoked.
    FunctionCallRequest {
        #[serde(default)]
        functions: Vec<FunctionCall>,
    },
    /// The agent finished speaking its current utterance.
    AgentAudioDone,
    /// A vendor-side error description. Informational only.
    Error {
        #[serde(default)]
        description: String,
    },
    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    /// Decodes a text frame, treating undecodable payloads as [`Unknown`]
    /// rather than an error. A malformed frame must never tear down a call.
    ///
    /// [`Unknown`]: AgentEvent::Unknown
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("undecodable agent frame treated as unknown: {}", e);
                AgentEvent::Unknown
            }
        }
    }
}

/// One requested tool invocation.
///
/// `arguments` arrives either as a JSON object or as a string containing
/// JSON, depending on the vendor; the validator handles both.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// The reply the agent expects after a tool invocation, so it can narrate
/// the result to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum FunctionCallResponse {
    FunctionCallResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        content: String,
    },
}

impl FunctionCallResponse {
    pub fn new(id: Option<String>, name: &str, content: &str) -> Self {
        FunctionCallResponse::FunctionCallResponse {
            id,
            name: name.to_string(),
            content: content.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_conversation_text() {
        let event =
            AgentEvent::decode(r#"{"type":"ConversationText","role":"user","content":"hi there"}"#);
        match event {
            AgentEvent::ConversationText { role, content } => {
                assert_eq!(role.as_deref(), Some("user"));
                assert_eq!(content, "hi there");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn decodes_function_call_request_with_string_arguments() {
        let event = AgentEvent::decode(
            r#"{"type":"FunctionCallRequest","functions":[{"id":"f1","name":"create_order","arguments":"{\"customer_name\":\"Sam\"}"}]}"#,
        );
        match event {
            AgentEvent::FunctionCallRequest { functions } => {
                assert_eq!(functions.len(), 1);
                assert_eq!(functions[0].name, "create_order");
                assert!(functions[0].arguments.is_string());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unrecognized_type_decodes_to_unknown() {
        assert!(matches!(
            AgentEvent::decode(r#"{"type":"PromptUpdated","detail":42}"#),
            AgentEvent::Unknown
        ));
    }

    #[test]
    fn malformed_json_decodes_to_unknown() {
        assert!(matches!(
            AgentEvent::decode("not json at all"),
            AgentEvent::Unknown
        ));
    }

    #[test]
    fn function_call_response_serializes_with_type_tag() {
        let response = FunctionCallResponse::new(Some("f1".to_string()), "create_order", "ok");
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["type"], "FunctionCallResponse");
        assert_eq!(json["id"], "f1");
        assert_eq!(json["content"], "ok");
    }
}
