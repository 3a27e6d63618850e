//! The settings handshake payload.
//!
//! Sent exactly once per session, after the agent's `Welcome` and before
//! any audio. Pins the telephony audio format (8 kHz mono mulaw, no
//! container) on both legs and installs the behavior prompt plus the
//! per-call guardrail fragment and tool catalog.

use serde::Serialize;

/// Telephony carriers deliver and accept 8 kHz mulaw.
pub const AUDIO_ENCODING: &str = "mulaw";
pub const AUDIO_SAMPLE_RATE: u32 = 8000;

/// Standing conversational behavior, independent of the menu of the day.
const BEHAVIOR_PROMPT: &str = "\
You are the phone host for a restaurant, taking orders and reservations.
Keep every turn short and natural. Never repeat the same phrase twice in a
row. Ask one question at a time. Ask for the caller's name before taking
any order or reservation. When the caller has given everything needed, call
the matching tool instead of describing what you would do.";

const GREETING: &str =
    "Thanks for calling! Would you like to place an order or make a reservation?";

/// The complete handshake message, built per call from the guardrail
/// fragment derived from the live menu catalog.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    audio: AudioConfig,
    agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize)]
struct AudioConfig {
    input: AudioFormat,
    output: AudioFormat,
}

#[derive(Debug, Clone, Serialize)]
struct AudioFormat {
    encoding: &'static str,
    sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
struct AgentConfig {
    greeting: &'static str,
    think: ThinkConfig,
}

#[derive(Debug, Clone, Serialize)]
struct ThinkConfig {
    prompt: String,
    functions: Vec<serde_json::Value>,
}

impl SettingsMessage {
    /// Builds the handshake with the given guardrail fragment appended to
    /// the standing behavior prompt.
    pub fn new(guardrail: &str) -> Self {
        SettingsMessage {
            kind: "Settings",
            audio: AudioConfig {
                input: AudioFormat {
                    encoding: AUDIO_ENCODING,
                    sample_rate: AUDIO_SAMPLE_RATE,
                    container: None,
                },
                output: AudioFormat {
                    encoding: AUDIO_ENCODING,
                    sample_rate: AUDIO_SAMPLE_RATE,
                    container: Some("none"),
                },
            },
            agent: AgentConfig {
                greeting: GREETING,
                think: ThinkConfig {
                    prompt: format!("{}\n\n{}", BEHAVIOR_PROMPT, guardrail),
                    functions: tool_catalog(),
                },
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The tools the agent may call, described to it in the handshake.
fn tool_catalog() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({
            "name": "create_order",
            "description": "Place a pickup food order once the caller has confirmed their name and items.",
            "parameters": {
                "type": "object",
                "properties": {
                    "customer_name": { "type": "string" },
                    "customer_phone": { "type": "string" },
                    "pickup_time": { "type": "string" },
                    "total_cents": { "type": "integer" },
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "qty": { "type": "integer" },
                                "line_total_cents": { "type": "integer" }
                            },
                            "required": ["name"]
                        }
                    },
                    "notes": { "type": "string" }
                },
                "required": ["customer_name"]
            }
        }),
        serde_json::json!({
            "name": "create_reservation",
            "description": "Book a table once the caller has confirmed their name, party size, and time.",
            "parameters": {
                "type": "object",
                "properties": {
                    "guest_name": { "type": "string" },
                    "guest_phone": { "type": "string" },
                    "party_size": { "type": "integer" },
                    "date": { "type": "string" },
                    "time": { "type": "string" },
                    "occasion": { "type": "string" },
                    "status": { "type": "string", "enum": ["confirmed", "escalated"] }
                },
                "required": ["guest_name"]
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_pin_telephony_audio_on_both_legs() {
        let json: serde_json::Value =
            serde_json::from_str(&SettingsMessage::new("no guardrail").to_json().expect("json"))
                .expect("parse");
        assert_eq!(json["type"], "Settings");
        assert_eq!(json["audio"]["input"]["encoding"], "mulaw");
        assert_eq!(json["audio"]["input"]["sample_rate"], 8000);
        assert_eq!(json["audio"]["output"]["sample_rate"], 8000);
        assert_eq!(json["audio"]["output"]["container"], "none");
    }

    #[test]
    fn guardrail_fragment_lands_in_the_prompt() {
        let settings = SettingsMessage::new("Only sell the caesar salad.");
        let json: serde_json::Value =
            serde_json::from_str(&settings.to_json().expect("json")).expect("parse");
        let prompt = json["agent"]["think"]["prompt"].as_str().expect("prompt");
        assert!(prompt.contains("Only sell the caesar salad."));
        assert!(prompt.contains("Ask one question at a time"));
    }

    #[test]
    fn both_tools_are_advertised() {
        let settings = SettingsMessage::new("");
        let json: serde_json::Value =
            serde_json::from_str(&settings.to_json().expect("json")).expect("parse");
        let names: Vec<&str> = json["agent"]["think"]["functions"]
            .as_array()
            .expect("functions")
            .iter()
            .filter_map(|f| f["name"].as_str())
            .collect();
        assert_eq!(names, vec!["create_order", "create_reservation"]);
    }
}
