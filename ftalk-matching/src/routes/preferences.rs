use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use ftalk_shared::errors::{AppError, AppResult, ErrorCode};
use ftalk_shared::types::api::ApiResponse;
use ftalk_shared::types::auth::AuthUser;

use crate::models::{ChatPreferences, ChatType, UpsertChatPreferences};
use crate::routes::sessions::AgeRange;
use crate::store::sessions as store;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    #[validate(length(max = 10, message = "at most 10 interests"))]
    pub interests: Option<Vec<String>>,
    pub age_range: Option<AgeRange>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub chat_type: Option<String>,
    pub auto_skip: Option<bool>,
    pub skip_delay_secs: Option<i32>,
}

/// GET /preferences
pub async fn get_preferences(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ChatPreferences>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let prefs = store::get_preferences(&mut conn, auth_user.id)?
        .ok_or_else(|| AppError::not_found("no chat preferences saved yet"))?;

    Ok(Json(ApiResponse::ok(prefs)))
}

/// PATCH /preferences — partial update over existing values (or defaults on
/// first write), persisted as an upsert.
pub async fn update_preferences(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> AppResult<Json<ApiResponse<ChatPreferences>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    if let Some(ref chat_type) = req.chat_type {
        chat_type
            .parse::<ChatType>()
            .map_err(|e| AppError::new(ErrorCode::ValidationError, e))?;
    }
    if let Some(ref range) = req.age_range {
        if range.min > range.max {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "age range minimum exceeds maximum",
            ));
        }
    }
    if let Some(delay) = req.skip_delay_secs {
        if !(0..=300).contains(&delay) {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "skip delay must be between 0 and 300 seconds",
            ));
        }
    }

    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let existing = store::get_preferences(&mut conn, auth_user.id)?;

    let merged = UpsertChatPreferences {
        user_id: auth_user.id,
        interests: req
            .interests
            .unwrap_or_else(|| existing.as_ref().map(|p| p.interests.clone()).unwrap_or_default()),
        age_min: req
            .age_range
            .as_ref()
            .map(|r| Some(r.min))
            .unwrap_or_else(|| existing.as_ref().and_then(|p| p.age_min)),
        age_max: req
            .age_range
            .as_ref()
            .map(|r| Some(r.max))
            .unwrap_or_else(|| existing.as_ref().and_then(|p| p.age_max)),
        location: req
            .location
            .or_else(|| existing.as_ref().and_then(|p| p.location.clone())),
        gender: req
            .gender
            .or_else(|| existing.as_ref().and_then(|p| p.gender.clone())),
        chat_type: req
            .chat_type
            .unwrap_or_else(|| {
                existing
                    .as_ref()
                    .map(|p| p.chat_type.clone())
                    .unwrap_or_else(|| "text".into())
            }),
        auto_skip: req
            .auto_skip
            .unwrap_or_else(|| existing.as_ref().map(|p| p.auto_skip).unwrap_or(false)),
        skip_delay_secs: req
            .skip_delay_secs
            .unwrap_or_else(|| existing.as_ref().map(|p| p.skip_delay_secs).unwrap_or(30)),
        updated_at: Utc::now(),
    };

    let prefs = store::upsert_preferences(&mut conn, &merged)?;

    tracing::debug!(user_id = %auth_user.id, "chat preferences updated");

    Ok(Json(ApiResponse::ok(prefs)))
}
