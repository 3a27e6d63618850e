//! Read-only operations API: what the restaurant staff dashboard polls.

use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use hostline_store::{Call, Order, Reservation, StoreError, StoredTurn};
use serde::Serialize;
use std::sync::Arc;

/// Upper bound on list responses.
const DEFAULT_LIST_LIMIT: i64 = 100;

/// A call with its full transcript.
#[derive(Debug, Serialize)]
pub struct CallDetail {
    pub call: Call,
    pub transcript: Vec<StoredTurn>,
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> StatusCode {
    tracing::error!("{}: {}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// `GET /api/calls` — recent calls, newest first.
pub async fn list_calls_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Call>>, StatusCode> {
    let pool = state.pool.clone();
    let calls = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| internal_error("pool error listing calls", e))?;
        hostline_store::list_calls(&conn, DEFAULT_LIST_LIMIT)
            .map_err(|e| internal_error("failed to list calls", e))
    })
    .await
    .map_err(|e| internal_error("list calls task join error", e))??;
    Ok(Json(calls))
}

/// `GET /api/calls/{callSid}` — one call plus its transcript.
pub async fn get_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
) -> Result<Json<CallDetail>, StatusCode> {
    let pool = state.pool.clone();
    let detail = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| internal_error("pool error fetching call", e))?;
        let call = hostline_store::get_call(&conn, &call_sid).map_err(|e| match e {
            StoreError::CallNotFound(_) => StatusCode::NOT_FOUND,
            other => internal_error("failed to fetch call", other),
        })?;
        let transcript = hostline_store::list_transcript_turns(&conn, &call.call_sid)
            .map_err(|e| internal_error("failed to fetch transcript", e))?;
        Ok::<_, StatusCode>(CallDetail { call, transcript })
    })
    .await
    .map_err(|e| internal_error("get call task join error", e))??;
    Ok(Json(detail))
}

/// `GET /api/orders` — recent orders, newest first.
pub async fn list_orders_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Order>>, StatusCode> {
    let pool = state.pool.clone();
    let orders = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| internal_error("pool error listing orders", e))?;
        hostline_store::list_orders(&conn, DEFAULT_LIST_LIMIT)
            .map_err(|e| internal_error("failed to list orders", e))
    })
    .await
    .map_err(|e| internal_error("list orders task join error", e))??;
    Ok(Json(orders))
}

/// `GET /api/reservations` — recent reservations, newest first.
pub async fn list_reservations_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Reservation>>, StatusCode> {
    let pool = state.pool.clone();
    let reservations = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| internal_error("pool error listing reservations", e))?;
        hostline_store::list_reservations(&conn, DEFAULT_LIST_LIMIT)
            .map_err(|e| internal_error("failed to list reservations", e))
    })
    .await
    .map_err(|e| internal_error("list reservations task join error", e))??;
    Ok(Json(reservations))
}
