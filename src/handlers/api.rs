//! REST views over the call registry.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "reacho" }))
}

pub async fn list_calls(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "active_calls": state.registry.active_calls(),
        "queued": state.scheduler.queue_len(),
        "dialer": state.scheduler.state(),
    }))
}

pub async fn get_call(
    Path(call_sid): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Value>> {
    let session = state
        .registry
        .get(&call_sid)
        .ok_or_else(|| AppError::NotFound(format!("no active call {call_sid}")))?;
    Ok(Json(json!({
        "call": session.summary(),
        "history": session.history_snapshot(),
    })))
}

/// Asks the telephony provider to terminate the call. Registry cleanup
/// happens when the terminal status webhook or stream teardown lands.
pub async fn end_call(
    Path(call_sid): Path<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Value>> {
    let session = state
        .registry
        .get(&call_sid)
        .ok_or_else(|| AppError::NotFound(format!("no active call {call_sid}")))?;

    state
        .telephony
        .end_call(&call_sid)
        .await
        .map_err(|e| AppError::InternalServerError(format!("failed to end call: {e}")))?;

    info!(%call_sid, "call termination requested via API");
    Ok(Json(json!({
        "call_sid": call_sid,
        "status": session.status(),
        "ending": true,
    })))
}
