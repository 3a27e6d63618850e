//! Shared types and constants for the Hostline platform.
//!
//! This crate provides the foundational types used across all Hostline
//! crates: call lifecycle status, transcript roles, the versioned
//! `StructuredOutcome` schema, and menu catalog items.
//!
//! No crate in the workspace depends on anything *except* `hostline-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

use serde::{Deserialize, Serialize};

/// Current `StructuredOutcome` schema version.
pub const OUTCOME_SCHEMA_VERSION: u32 = 1;

/// Lifecycle status of a persisted call record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// The call is live (or the close path never fired).
    InProgress,
    /// The call ended normally or was reconciled.
    Completed,
    /// The call failed before media flowed.
    Failed,
}

impl CallStatus {
    /// Returns the canonical string label stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown call status: {0}")]
pub struct ParseStatusError(pub String);

/// Speaker role for a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The caller.
    User,
    /// The voice-AI agent.
    Assistant,
    /// Protocol or service messages.
    System,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for TurnRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// A single transcript turn, append-only and ordered by arrival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: TurnRole,
    pub text: String,
}

impl TranscriptTurn {
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Where a [`StructuredOutcome`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    /// Emitted by the agent as a structured tool call (authoritative).
    ModelTool,
    /// Reconstructed from the raw transcript (best-effort fallback).
    TranscriptFallback,
}

impl OutcomeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ModelTool => "model_tool",
            Self::TranscriptFallback => "transcript_fallback",
        }
    }
}

/// Reservation disposition after a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// All booking details were explicitly captured.
    Confirmed,
    /// Something was missing; a human must follow up.
    Escalated,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Escalated => "escalated",
        }
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "escalated" => Ok(Self::Escalated),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Caller identity as understood at the end of a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Display name. Fabricated from the phone number when unverified.
    pub name: String,
    /// True only when the name came from a genuine announcement pattern
    /// or an explicit tool-call field.
    pub has_verified_name: bool,
    /// Caller phone number, if known.
    pub phone: Option<String>,
}

/// Which business intents were detected on the call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CallIntents {
    pub order: bool,
    pub reservation: bool,
}

/// One line of a food order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_item_id: Option<i64>,
    pub qty: u32,
    pub line_total_cents: i64,
}

/// Order details captured from a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderDetails {
    pub pickup_time: String,
    pub total_cents: i64,
    pub items: Vec<OrderItem>,
}

/// Reservation details captured from a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationDetails {
    pub party_size: u32,
    pub date: String,
    pub time: String,
    pub occasion: String,
    pub status: ReservationStatus,
}

impl Default for ReservationDetails {
    fn default() -> Self {
        Self {
            party_size: 2,
            date: "today".to_string(),
            time: "ASAP".to_string(),
            occasion: "Not specified".to_string(),
            status: ReservationStatus::Escalated,
        }
    }
}

/// The canonical business result of one call, regardless of source.
///
/// At most one outcome is "current" per call. Materialization is idempotent
/// per call identifier: a later outcome never duplicates already-persisted
/// order or reservation rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredOutcome {
    pub schema_version: u32,
    pub source: OutcomeSource,
    pub customer: CustomerInfo,
    pub intents: CallIntents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<ReservationDetails>,
}

impl StructuredOutcome {
    /// Creates an empty outcome with the given source.
    pub fn new(source: OutcomeSource) -> Self {
        Self {
            schema_version: OUTCOME_SCHEMA_VERSION,
            source,
            customer: CustomerInfo::default(),
            intents: CallIntents::default(),
            order: None,
            reservation: None,
        }
    }
}

/// An orderable item from the active menu catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_status_round_trips_through_labels() {
        for status in [
            CallStatus::InProgress,
            CallStatus::Completed,
            CallStatus::Failed,
        ] {
            let parsed: CallStatus = status.as_str().parse().expect("label should parse");
            assert_eq!(parsed, status);
        }
        assert!("ringing".parse::<CallStatus>().is_err());
    }

    #[test]
    fn outcome_serializes_snake_case_source() {
        let outcome = StructuredOutcome::new(OutcomeSource::ModelTool);
        let json = serde_json::to_value(&outcome).expect("serialization should not fail");
        assert_eq!(json["source"], "model_tool");
        assert_eq!(json["schema_version"], 1);
        assert!(json.get("order").is_none(), "empty order should be omitted");
    }

    #[test]
    fn reservation_defaults_are_escalated_asap() {
        let details = ReservationDetails::default();
        assert_eq!(details.party_size, 2);
        assert_eq!(details.time, "ASAP");
        assert_eq!(details.status, ReservationStatus::Escalated);
    }
}
