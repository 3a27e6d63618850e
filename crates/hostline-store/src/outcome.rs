//! The Outcome Materializer: turns a [`StructuredOutcome`] into persisted
//! order/reservation rows, exactly once per call.

use crate::calls::update_call_summary;
use crate::error::StoreError;
use crate::records::{
    call_tag, create_order, create_reservation, find_tagged_order, find_tagged_reservation,
    NewOrder, NewReservation,
};
use hostline_types::StructuredOutcome;
use rusqlite::Connection;

/// What a materialization attempt actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub order_created: bool,
    pub reservation_created: bool,
}

/// Idempotently persists the business result of one call.
///
/// For each intent present on the outcome, the `[call:<sid>]` tag lookup
/// runs first; a row already tagged with this call identifier means a prior
/// materialization won and this one backs off. The call's one-line summary
/// is refreshed either way.
pub fn materialize_outcome(
    conn: &Connection,
    call_sid: &str,
    caller_phone: Option<&str>,
    outcome: &StructuredOutcome,
) -> Result<MaterializeReport, StoreError> {
    let mut report = MaterializeReport::default();
    let tag = call_tag(call_sid);
    let phone = outcome
        .customer
        .phone
        .as_deref()
        .or(caller_phone)
        .map(str::to_string);

    if outcome.intents.order {
        if find_tagged_order(conn, call_sid)?.is_some() {
            tracing::debug!(call_sid, "order already materialized, skipping");
        } else {
            let details = outcome.order.clone().unwrap_or_default();
            let item_names: Vec<&str> =
                details.items.iter().map(|i| i.name.as_str()).collect();
            let notes = format!(
                "Phone order via {} — {} item(s): {}. {}",
                outcome.source.as_str(),
                details.items.len(),
                if item_names.is_empty() {
                    "none recognized".to_string()
                } else {
                    item_names.join(", ")
                },
                tag
            );
            create_order(
                conn,
                &NewOrder {
                    call_sid: Some(call_sid.to_string()),
                    customer_name: outcome.customer.name.clone(),
                    customer_phone: phone.clone(),
                    pickup_time: Some(details.pickup_time.clone()),
                    total_cents: details.total_cents,
                    items: details.items,
                    notes: Some(notes),
                },
            )?;
            report.order_created = true;
        }
    }

    if outcome.intents.reservation {
        if find_tagged_reservation(conn, call_sid)?.is_some() {
            tracing::debug!(call_sid, "reservation already materialized, skipping");
        } else {
            let details = outcome.reservation.clone().unwrap_or_default();
            let notes = format!(
                "Phone reservation via {} — {}. {}",
                outcome.source.as_str(),
                details.status.as_str(),
                tag
            );
            create_reservation(
                conn,
                &NewReservation {
                    call_sid: Some(call_sid.to_string()),
                    guest_name: outcome.customer.name.clone(),
                    guest_phone: phone,
                    party_size: details.party_size,
                    reservation_date: Some(details.date.clone()),
                    reservation_time: Some(details.time.clone()),
                    occasion: Some(details.occasion.clone()),
                    status: details.status,
                    notes: Some(notes),
                },
            )?;
            report.reservation_created = true;
        }
    }

    if let Err(e) = update_call_summary(conn, call_sid, &summarize(outcome)) {
        // A summary is cosmetic; a missing call row must not fail the write.
        tracing::warn!(call_sid, "failed to update call summary: {}", e);
    }

    Ok(report)
}

/// Builds the one-line human-readable call summary: customer name, detected
/// intents, and up to 5 mentioned item names.
fn summarize(outcome: &StructuredOutcome) -> String {
    let mut intents = Vec::new();
    if outcome.intents.order {
        intents.push("order");
    }
    if outcome.intents.reservation {
        intents.push("reservation");
    }
    let intent_str = if intents.is_empty() {
        "no clear intent".to_string()
    } else {
        intents.join(" + ")
    };

    let items: Vec<&str> = outcome
        .order
        .as_ref()
        .map(|o| o.items.iter().take(5).map(|i| i.name.as_str()).collect())
        .unwrap_or_default();

    if items.is_empty() {
        format!("{} — {}", outcome.customer.name, intent_str)
    } else {
        format!(
            "{} — {} ({})",
            outcome.customer.name,
            intent_str,
            items.join(", ")
        )
    }
}
