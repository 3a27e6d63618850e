//! Call records, transcript turns, the event log, and stale-call
//! reconciliation.

use crate::error::StoreError;
use hostline_types::{CallStatus, TurnRole};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// A persisted call record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Call {
    /// Internal database ID.
    pub id: i64,
    /// Carrier-assigned call identifier.
    pub call_sid: String,
    /// Caller phone number, as reported by the carrier.
    pub from_number: Option<String>,
    /// Dialed phone number.
    pub to_number: Option<String>,
    /// Lifecycle status.
    pub status: CallStatus,
    /// One-line human-readable summary, set at materialization time.
    pub summary: Option<String>,
    /// Creation timestamp (ISO 8601).
    pub started_at: String,
    /// End timestamp, set by the close path or the reconciler.
    pub ended_at: Option<String>,
}

/// Parameters for upserting the initial call record from the voice webhook.
#[derive(Debug, Clone)]
pub struct UpsertCallParams {
    pub call_sid: String,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
}

/// Inserts a call record, or refreshes caller metadata if the SID already
/// exists. The webhook may fire more than once for the same call; the row
/// must not be duplicated and an existing status must not be reset.
pub fn upsert_call(conn: &Connection, params: &UpsertCallParams) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO calls (call_sid, from_number, to_number, status)
         VALUES (?1, ?2, ?3, 'in_progress')
         ON CONFLICT(call_sid) DO UPDATE SET
            from_number = COALESCE(excluded.from_number, from_number),
            to_number = COALESCE(excluded.to_number, to_number)",
        params![params.call_sid, params.from_number, params.to_number],
    )?;
    Ok(())
}

/// Retrieves a call by its carrier SID.
pub fn get_call(conn: &Connection, call_sid: &str) -> Result<Call, StoreError> {
    conn.query_row(
        "SELECT id, call_sid, from_number, to_number, status, summary, started_at, ended_at
         FROM calls WHERE call_sid = ?1",
        [call_sid],
        map_row_to_call,
    )
    .optional()?
    .ok_or_else(|| StoreError::CallNotFound(call_sid.to_string()))
}

/// Lists calls, newest first, bounded by `limit`.
pub fn list_calls(conn: &Connection, limit: i64) -> Result<Vec<Call>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, call_sid, from_number, to_number, status, summary, started_at, ended_at
         FROM calls ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], map_row_to_call)?;
    let mut calls = Vec::new();
    for row in rows {
        calls.push(row?);
    }
    Ok(calls)
}

/// Marks a call completed with an end timestamp of now.
///
/// A no-op for calls already completed, so the normal close path and the
/// reconciler can both run without stepping on each other.
pub fn complete_call(conn: &Connection, call_sid: &str) -> Result<bool, StoreError> {
    let updated = conn.execute(
        "UPDATE calls SET status = 'completed', ended_at = datetime('now')
         WHERE call_sid = ?1 AND status = 'in_progress'",
        [call_sid],
    )?;
    Ok(updated > 0)
}

/// Sets the one-line human-readable summary for a call.
pub fn update_call_summary(
    conn: &Connection,
    call_sid: &str,
    summary: &str,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE calls SET summary = ?2 WHERE call_sid = ?1",
        params![call_sid, summary],
    )?;
    if updated == 0 {
        return Err(StoreError::CallNotFound(call_sid.to_string()));
    }
    Ok(())
}

/// A persisted transcript turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTurn {
    pub id: i64,
    pub call_sid: String,
    pub role: TurnRole,
    pub text: String,
    pub created_at: String,
}

/// Appends one transcript turn. Append-only; duplicates from at-least-once
/// delivery are acceptable.
pub fn insert_transcript_turn(
    conn: &Connection,
    call_sid: &str,
    role: TurnRole,
    text: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO transcript_turns (call_sid, role, text) VALUES (?1, ?2, ?3)",
        params![call_sid, role.as_str(), text],
    )?;
    Ok(())
}

/// Lists a call's transcript in arrival order.
pub fn list_transcript_turns(
    conn: &Connection,
    call_sid: &str,
) -> Result<Vec<StoredTurn>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, call_sid, role, text, created_at
         FROM transcript_turns WHERE call_sid = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([call_sid], |row| {
        let role_str: String = row.get(2)?;
        let role = role_str.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(StoredTurn {
            id: row.get(0)?,
            call_sid: row.get(1)?,
            role,
            text: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;
    let mut turns = Vec::new();
    for row in rows {
        turns.push(row?);
    }
    Ok(turns)
}

/// A row from the per-call event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    pub id: i64,
    pub call_sid: String,
    pub event_type: String,
    pub payload_json: String,
    pub created_at: String,
}

/// Writes a single event to the call event log.
pub fn insert_call_event(
    conn: &Connection,
    call_sid: &str,
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<(), StoreError> {
    let payload_json = serde_json::to_string(payload)?;
    conn.execute(
        "INSERT INTO call_events (call_sid, event_type, payload_json) VALUES (?1, ?2, ?3)",
        params![call_sid, event_type, payload_json],
    )?;
    Ok(())
}

/// Flips calls stuck `in_progress` past the age threshold to `completed`
/// with an end timestamp of now. Returns the SIDs that were reconciled.
///
/// Safe to run concurrently with normal call completion: a call already
/// completed by the normal path simply won't match the status filter.
pub fn reconcile_stale(
    conn: &Connection,
    threshold_minutes: u32,
) -> Result<Vec<String>, StoreError> {
    let cutoff = format!("-{} minutes", threshold_minutes);
    let mut stmt = conn.prepare(
        "SELECT call_sid FROM calls
         WHERE status = 'in_progress' AND started_at < datetime('now', ?1)",
    )?;
    let rows = stmt.query_map([&cutoff], |row| row.get::<_, String>(0))?;
    let mut stale = Vec::new();
    for row in rows {
        stale.push(row?);
    }

    if !stale.is_empty() {
        conn.execute(
            "UPDATE calls SET status = 'completed', ended_at = datetime('now')
             WHERE status = 'in_progress' AND started_at < datetime('now', ?1)",
            [&cutoff],
        )?;
    }
    Ok(stale)
}

fn map_row_to_call(row: &Row) -> rusqlite::Result<Call> {
    let status_str: String = row.get(4)?;
    let status: CallStatus = status_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Call {
        id: row.get(0)?,
        call_sid: row.get(1)?,
        from_number: row.get(2)?,
        to_number: row.get(3)?,
        status,
        summary: row.get(5)?,
        started_at: row.get(6)?,
        ended_at: row.get(7)?,
    })
}
