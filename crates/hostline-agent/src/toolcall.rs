//! The tool-call validator.
//!
//! The model's tool arguments are untrusted input: fields go missing, types
//! drift, and totals occasionally arrive negative. Validation is lenient
//! where a safe default exists and strict where none does: a customer name
//! is required, and a malformed order item sinks the whole payload. A
//! rejected call is logged and dropped, never surfaced to the caller as an
//! error.

use hostline_types::{
    OrderDetails, OrderItem, OutcomeSource, ReservationDetails, ReservationStatus,
    StructuredOutcome,
};
use serde_json::Value;

/// Validates one tool invocation and, when acceptable, maps it to a
/// [`StructuredOutcome`] with `source = model_tool`. Returns `None` for an
/// unknown tool name or arguments that fail validation.
pub fn validate_tool_call(name: &str, arguments: &Value) -> Option<StructuredOutcome> {
    let args = normalize_arguments(arguments)?;
    match name {
        "create_order" => validate_create_order(&args),
        "create_reservation" => validate_create_reservation(&args),
        other => {
            tracing::warn!(tool = other, "agent requested an unknown tool");
            None
        }
    }
}

/// Some vendors send `arguments` as a JSON object, others as a string
/// containing JSON. Either way an object must come out.
fn normalize_arguments(arguments: &Value) -> Option<Value> {
    match arguments {
        Value::Object(_) => Some(arguments.clone()),
        Value::String(inner) => match serde_json::from_str::<Value>(inner) {
            Ok(parsed @ Value::Object(_)) => Some(parsed),
            Ok(_) | Err(_) => {
                tracing::warn!("tool arguments string did not contain a JSON object");
                None
            }
        },
        _ => {
            tracing::warn!("tool arguments were neither an object nor a string");
            None
        }
    }
}

fn validate_create_order(args: &Value) -> Option<StructuredOutcome> {
    let name = required_name(args, "customer_name")?;

    let total_cents = args["total_cents"].as_i64().unwrap_or(0);
    if total_cents < 0 {
        tracing::warn!(total_cents, "rejecting order with negative total");
        return None;
    }

    // One malformed item poisons the whole payload. Persisting a partial
    // order would hand the kitchen something the caller never agreed to.
    let mut items = Vec::new();
    for item in args["items"].as_array().map(Vec::as_slice).unwrap_or(&[]) {
        let item_name = match item["name"].as_str().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => {
                tracing::warn!(item = %item, "rejecting order containing an unnamed item");
                return None;
            }
        };
        let qty = match item["qty"].as_i64() {
            Some(n) if n > 0 => n as u32,
            None => 1,
            Some(n) => {
                tracing::warn!(item = %item, qty = n, "rejecting order containing a non-positive item qty");
                return None;
            }
        };
        items.push(OrderItem {
            name: item_name.to_string(),
            menu_item_id: item["menu_item_id"].as_i64(),
            qty,
            line_total_cents: item["line_total_cents"].as_i64().unwrap_or(0),
        });
    }

    let mut outcome = StructuredOutcome::new(OutcomeSource::ModelTool);
    outcome.customer.name = name;
    outcome.customer.has_verified_name = true;
    outcome.customer.phone = optional_string(args, "customer_phone");
    outcome.intents.order = true;
    outcome.order = Some(OrderDetails {
        pickup_time: optional_string(args, "pickup_time").unwrap_or_else(|| "20 minutes".to_string()),
        total_cents,
        items,
    });
    Some(outcome)
}

fn validate_create_reservation(args: &Value) -> Option<StructuredOutcome> {
    let name = required_name(args, "guest_name")?;

    let party_size = match args["party_size"].as_i64() {
        Some(n) if n > 0 => n as u32,
        Some(n) => {
            tracing::warn!(party_size = n, "rejecting reservation with non-positive party size");
            return None;
        }
        None => 2,
    };

    let status = match args["status"].as_str() {
        None => ReservationStatus::Confirmed,
        Some(raw) => match raw.parse::<ReservationStatus>() {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(status = raw, "rejecting reservation with unknown status");
                return None;
            }
        },
    };

    let mut outcome = StructuredOutcome::new(OutcomeSource::ModelTool);
    outcome.customer.name = name;
    outcome.customer.has_verified_name = true;
    outcome.customer.phone = optional_string(args, "guest_phone");
    outcome.intents.reservation = true;
    outcome.reservation = Some(ReservationDetails {
        party_size,
        date: optional_string(args, "date").unwrap_or_else(|| "today".to_string()),
        time: optional_string(args, "time").unwrap_or_else(|| "ASAP".to_string()),
        occasion: optional_string(args, "occasion").unwrap_or_else(|| "Not specified".to_string()),
        status,
    });
    Some(outcome)
}

fn required_name(args: &Value, field: &str) -> Option<String> {
    match args[field].as_str().map(str::trim) {
        Some(name) if !name.is_empty() => Some(name.to_string()),
        _ => {
            tracing::warn!(field, "rejecting tool call with missing or empty name");
            None
        }
    }
}

fn optional_string(args: &Value, field: &str) -> Option<String> {
    args[field]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
