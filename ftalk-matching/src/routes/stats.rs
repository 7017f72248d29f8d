use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use ftalk_shared::errors::{AppError, AppResult};
use ftalk_shared::types::api::ApiResponse;
use ftalk_shared::types::auth::AuthUser;
use ftalk_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::ChatSession;
use crate::store::{cache, sessions as store};
use crate::AppState;

/// Suggested interests shown to users composing a session. Matching itself
/// accepts any free-form interest string.
pub const CURATED_INTERESTS: &[&str] = &[
    "Music", "Gaming", "Art", "Travel", "Food", "Movies", "Books", "Sports",
    "Fitness", "Photography", "Fashion", "Technology", "Science", "Nature",
    "Pets", "Dancing", "Writing", "Cooking", "Anime", "Crypto",
];

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_sessions: i64,
    pub total_matches: i64,
    pub messages_sent: i64,
}

#[derive(Debug, Serialize)]
pub struct OnlineCountResponse {
    pub online: i64,
}

/// GET /history — the caller's ended sessions, newest first.
pub async fn get_history(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<ChatSession>>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let (items, total) = store::ended_sessions_page(
        &mut conn,
        auth_user.id,
        params.limit() as i64,
        params.offset() as i64,
    )?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// GET /stats
pub async fn get_stats(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<StatsResponse>>> {
    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let stats = store::user_stats(&mut conn, auth_user.id)?;

    Ok(Json(ApiResponse::ok(StatsResponse {
        total_sessions: stats.total_sessions,
        total_matches: stats.total_matches,
        messages_sent: stats.messages_sent,
    })))
}

/// GET /interests
pub async fn get_interests() -> Json<ApiResponse<Vec<&'static str>>> {
    Json(ApiResponse::ok(CURATED_INTERESTS.to_vec()))
}

/// GET /online-count — cached count of live sessions; the cache is only an
/// accelerator, the store remains authoritative.
pub async fn get_online_count(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<OnlineCountResponse>>> {
    if let Some(cached) = cache::cached_online_count(&state.redis).await {
        return Ok(Json(ApiResponse::ok(OnlineCountResponse { online: cached })));
    }

    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(format!("database pool error: {e}")))?;

    let count = store::live_session_count(&mut conn)?;
    cache::store_online_count(&state.redis, count).await;

    Ok(Json(ApiResponse::ok(OnlineCountResponse { online: count })))
}
