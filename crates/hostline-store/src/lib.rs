//! Persistence operations for the Hostline platform.
//!
//! Implements call records, the append-only transcript, the per-call event
//! log, order and reservation rows, the menu catalog (and the guardrail
//! prompt derived from it), the idempotent Outcome Materializer, and the
//! stale-call reconciliation sweep.
//!
//! Every function here takes a plain `&rusqlite::Connection`; async callers
//! are expected to go through `tokio::task::spawn_blocking` with a pooled
//! connection from `hostline-db`.

mod calls;
mod catalog;
mod error;
mod outcome;
mod records;

pub use calls::{
    complete_call, get_call, insert_call_event, insert_transcript_turn, list_calls,
    list_transcript_turns, reconcile_stale, update_call_summary, upsert_call, Call, CallEvent,
    StoredTurn, UpsertCallParams,
};
pub use catalog::{fetch_active_catalog, guardrail_prompt, CATALOG_UNAVAILABLE_FALLBACK};
pub use error::StoreError;
pub use outcome::{materialize_outcome, MaterializeReport};
pub use records::{
    call_tag, create_order, create_reservation, find_tagged_order, find_tagged_reservation,
    list_orders, list_reservations, NewOrder, NewReservation, Order, Reservation,
};
