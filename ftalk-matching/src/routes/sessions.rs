use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use ftalk_shared::errors::{AppError, AppResult, ErrorCode};
use ftalk_shared::types::api::ApiResponse;
use ftalk_shared::types::auth::AuthUser;

use crate::matching::matchmaker::{self, MatchOutcome, SessionCriteria};
use crate::models::{ChatMessage, ChatSession, ChatType};
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AgeRange {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 10, message = "between 1 and 10 interests required"))]
    pub interests: Vec<String>,
    pub age_range: Option<AgeRange>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub chat_type: String,
}

#[derive(Debug, Deserialize)]
pub struct SkipRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub session_id: Uuid,
    #[validate(length(min = 1, max = 2000, message = "message must be 1-2000 characters"))]
    pub message: String,
    #[serde(default = "default_message_type")]
    pub message_type: String,
}

fn default_message_type() -> String {
    "text".into()
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub blocked_user_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchInfo {
    pub match_id: Uuid,
    pub partner_id: Uuid,
    pub partner_session_id: Uuid,
    pub compatibility_score: f64,
    pub shared_interests: Vec<String>,
    pub session: ChatSession,
}

/// `match` is null when no candidate reaches the compatibility threshold —
/// a successful empty result, not an error.
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub found: Option<MatchInfo>,
}

impl From<Option<MatchOutcome>> for MatchResponse {
    fn from(outcome: Option<MatchOutcome>) -> Self {
        Self {
            found: outcome.map(|o| MatchInfo {
                match_id: o.match_record.id,
                partner_id: o.partner_session.user_id,
                partner_session_id: o.partner_session.id,
                compatibility_score: o.match_record.compatibility_score,
                shared_interests: o.match_record.shared_interests,
                session: o.session,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// POST /sessions
// ---------------------------------------------------------------------------

pub async fn create_session(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ChatSession>>)> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    if req.interests.iter().any(|i| i.trim().is_empty()) {
        return Err(AppError::new(ErrorCode::ValidationError, "interests must not be blank"));
    }

    let chat_type: ChatType = req
        .chat_type
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;

    if let Some(ref range) = req.age_range {
        if range.min > range.max {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "age range minimum exceeds maximum",
            ));
        }
    }

    let criteria = SessionCriteria {
        interests: req.interests,
        age_min: req.age_range.as_ref().map(|r| r.min),
        age_max: req.age_range.as_ref().map(|r| r.max),
        location: req.location,
        gender: req.gender,
        chat_type: chat_type.as_str().to_string(),
    };

    let session = matchmaker::create_session(&state, auth_user.id, criteria).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(session))))
}

// ---------------------------------------------------------------------------
// POST /sessions/:id/match
// ---------------------------------------------------------------------------

pub async fn find_match(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MatchResponse>>> {
    let outcome = matchmaker::find_match(&state, session_id, auth_user.id).await?;
    Ok(Json(ApiResponse::ok(MatchResponse::from(outcome))))
}

// ---------------------------------------------------------------------------
// POST /sessions/:id/skip
// ---------------------------------------------------------------------------

pub async fn skip_match(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SkipRequest>,
) -> AppResult<Json<ApiResponse<ChatSession>>> {
    let session = matchmaker::skip_match(&state, session_id, auth_user.id, req.reason).await?;
    Ok(Json(ApiResponse::ok(session)))
}

// ---------------------------------------------------------------------------
// POST /sessions/:id/end
// ---------------------------------------------------------------------------

pub async fn end_session(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ChatSession>>> {
    let session = matchmaker::end_session(&state, session_id, auth_user.id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

// ---------------------------------------------------------------------------
// POST /sessions/messages
// ---------------------------------------------------------------------------

pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<ChatMessage>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let message = matchmaker::send_message(
        &state,
        req.session_id,
        auth_user.id,
        req.message,
        req.message_type,
    )
    .await?;

    Ok(Json(ApiResponse::ok(message)))
}

// ---------------------------------------------------------------------------
// GET /sessions/:id/messages
// ---------------------------------------------------------------------------

pub async fn list_messages(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<Json<ApiResponse<Vec<ChatMessage>>>> {
    let messages = matchmaker::get_messages(
        &state,
        session_id,
        auth_user.id,
        query.limit.unwrap_or(50),
        query.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(ApiResponse::ok(messages)))
}

// ---------------------------------------------------------------------------
// POST /sessions/:id/block
// ---------------------------------------------------------------------------

pub async fn block_user(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<BlockRequest>,
) -> AppResult<Json<ApiResponse<crate::models::ChatBlock>>> {
    let block = matchmaker::block_user(
        &state,
        session_id,
        auth_user.id,
        req.blocked_user_id,
        req.reason,
    )
    .await?;

    Ok(Json(ApiResponse::ok(block)))
}
