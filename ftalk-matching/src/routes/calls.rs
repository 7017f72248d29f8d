use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use ftalk_shared::errors::{AppError, AppResult, ErrorCode};
use ftalk_shared::types::api::ApiResponse;
use ftalk_shared::types::auth::AuthUser;

use crate::events::publisher;
use crate::models::{CallSession, NewCallSession, SessionStatus};
use crate::store::sessions as store;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct InitiateCallRequest {
    pub call_type: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondCallRequest {
    pub accepted: bool,
}

// ---------------------------------------------------------------------------
// POST /sessions/:id/call
// ---------------------------------------------------------------------------

pub async fn initiate_call(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<InitiateCallRequest>,
) -> AppResult<Json<ApiResponse<CallSession>>> {
    if !matches!(req.call_type.as_str(), "audio" | "video") {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "call type must be audio or video",
        ));
    }

    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let session = store::get_session(&mut conn, session_id)?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "chat session not found"))?;

    if !session.is_participant(auth_user.id) {
        return Err(AppError::new(
            ErrorCode::NotSessionParticipant,
            "you are not a participant of this session",
        ));
    }
    if session.status() != SessionStatus::Active {
        return Err(AppError::conflict("calls require an active chat session"));
    }

    let callee_id = session
        .partner_id(auth_user.id)
        .ok_or_else(|| AppError::bad_request("session has no partner to call"))?;

    // One live call per chat session.
    if store::open_call_for_session(&mut conn, session_id)?.is_some() {
        return Err(AppError::conflict("a call is already open for this session"));
    }

    let new_call = NewCallSession {
        chat_session_id: session_id,
        caller_id: auth_user.id,
        callee_id,
        call_type: req.call_type,
        status: "initiated".into(),
        expires_at: Utc::now() + Duration::seconds(state.config.call_ring_timeout_secs),
    };

    let call = store::insert_call(&mut conn, &new_call)?;

    let _ = state.io.to(format!("user:{callee_id}")).emit(
        "call_requested",
        &serde_json::json!({
            "call_id": call.id,
            "chat_session_id": session_id,
            "caller_id": auth_user.id,
            "call_type": call.call_type,
        }),
    );

    publisher::publish_call_requested(&state.rabbitmq, &call).await;

    Ok(Json(ApiResponse::ok(call)))
}

// ---------------------------------------------------------------------------
// PUT /calls/:id/ring
// ---------------------------------------------------------------------------

/// Callee acknowledgment that its client is ringing.
pub async fn mark_ringing(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CallSession>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let call = store::get_call(&mut conn, call_id)?
        .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))?;

    if call.callee_id != auth_user.id {
        return Err(AppError::new(ErrorCode::NotInCall, "only the callee can acknowledge ringing"));
    }

    let now = Utc::now();
    if now > call.expires_at {
        store::expire_call_row(&mut conn, call_id, now)?;
        return Err(AppError::new(ErrorCode::CallExpired, "call request has expired"));
    }

    store::mark_call_ringing(&mut conn, call_id)?;

    let refreshed = store::get_call(&mut conn, call_id)?
        .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))?;

    Ok(Json(ApiResponse::ok(refreshed)))
}

// ---------------------------------------------------------------------------
// PUT /calls/:id/respond
// ---------------------------------------------------------------------------

pub async fn respond_call(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<Uuid>,
    Json(req): Json<RespondCallRequest>,
) -> AppResult<Json<ApiResponse<CallSession>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let call = store::get_call(&mut conn, call_id)?
        .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))?;

    if call.callee_id != auth_user.id {
        return Err(AppError::new(ErrorCode::NotInCall, "only the callee can respond to this call"));
    }

    let now = Utc::now();
    if now > call.expires_at {
        store::expire_call_row(&mut conn, call_id, now)?;
        return Err(AppError::new(ErrorCode::CallExpired, "call request has expired"));
    }

    let updated = store::answer_call(&mut conn, call_id, req.accepted, now)?
        .ok_or_else(|| {
            AppError::new(ErrorCode::CallAlreadyAnswered, "call has already been answered")
        })?;

    let _ = state.io.to(format!("user:{}", call.caller_id)).emit(
        "call_responded",
        &serde_json::json!({
            "call_id": call_id,
            "accepted": req.accepted,
        }),
    );

    publisher::publish_call_responded(&state.rabbitmq, &updated, req.accepted).await;

    Ok(Json(ApiResponse::ok(updated)))
}

// ---------------------------------------------------------------------------
// POST /calls/:id/end
// ---------------------------------------------------------------------------

pub async fn end_call(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CallSession>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let call = store::get_call(&mut conn, call_id)?
        .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))?;

    if call.caller_id != auth_user.id && call.callee_id != auth_user.id {
        return Err(AppError::new(ErrorCode::NotInCall, "you are not part of this call"));
    }

    // Ending twice is harmless; the guard just affects zero rows.
    store::end_call_row(&mut conn, call_id, Utc::now())?;

    let other = if call.caller_id == auth_user.id {
        call.callee_id
    } else {
        call.caller_id
    };
    let _ = state.io.to(format!("user:{other}")).emit(
        "call_ended",
        &serde_json::json!({ "call_id": call_id }),
    );

    let refreshed = store::get_call(&mut conn, call_id)?
        .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))?;

    Ok(Json(ApiResponse::ok(refreshed)))
}

// ---------------------------------------------------------------------------
// GET /calls/pending
// ---------------------------------------------------------------------------

pub async fn pending_calls(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<CallSession>>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let calls = store::pending_calls_for(&mut conn, auth_user.id, Utc::now())?;

    Ok(Json(ApiResponse::ok(calls)))
}
