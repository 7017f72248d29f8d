use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use ftalk_shared::errors::{AppError, AppResult, ErrorCode};
use ftalk_shared::types::api::ApiResponse;
use ftalk_shared::types::auth::AuthUser;

use crate::matching::matchmaker;
use crate::models::ChatReport;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub session_id: Uuid,
    #[validate(length(min = 1, max = 50, message = "reason is required"))]
    pub reason: String,
    #[validate(length(max = 1000, message = "description too long"))]
    pub description: Option<String>,
}

/// POST /sessions/report — append-only safety record; never mutates the
/// session.
pub async fn create_report(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReportRequest>,
) -> AppResult<Json<ApiResponse<ChatReport>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let report = matchmaker::report_user(
        &state,
        req.session_id,
        auth_user.id,
        req.reason,
        req.description,
    )
    .await?;

    Ok(Json(ApiResponse::ok(report)))
}
