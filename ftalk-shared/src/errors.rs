use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Chat session / matching errors
/// - E2xxx: Call errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    PersistenceUnavailable,
    BadRequest,
    TokenExpired,
    TokenInvalid,

    // Chat sessions / matching (E1xxx)
    ActiveSessionExists,
    SessionNotFound,
    SessionNotWaiting,
    SessionEnded,
    NotSessionParticipant,
    MatchNotFound,
    MessageNotFound,
    CannotReportSelf,
    CannotBlockSelf,

    // Calls (E2xxx)
    CallNotFound,
    CallExpired,
    CallAlreadyAnswered,
    NotInCall,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::Conflict => "E0006",
            Self::PersistenceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::TokenExpired => "E0009",
            Self::TokenInvalid => "E0010",

            // Chat sessions / matching
            Self::ActiveSessionExists => "E1001",
            Self::SessionNotFound => "E1002",
            Self::SessionNotWaiting => "E1003",
            Self::SessionEnded => "E1004",
            Self::NotSessionParticipant => "E1005",
            Self::MatchNotFound => "E1006",
            Self::MessageNotFound => "E1007",
            Self::CannotReportSelf => "E1008",
            Self::CannotBlockSelf => "E1009",

            // Calls
            Self::CallNotFound => "E2001",
            Self::CallExpired => "E2002",
            Self::CallAlreadyAnswered => "E2003",
            Self::NotInCall => "E2004",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::PersistenceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::CallExpired => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::SessionNotFound | Self::MatchNotFound
            | Self::MessageNotFound | Self::CallNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotSessionParticipant | Self::CannotReportSelf
            | Self::CannotBlockSelf | Self::NotInCall => StatusCode::FORBIDDEN,
            Self::Conflict | Self::ActiveSessionExists | Self::SessionNotWaiting
            | Self::SessionEnded | Self::CallAlreadyAnswered => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0007", "persistence layer error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::ValidationError.code(), "E0002");
        assert_eq!(ErrorCode::ActiveSessionExists.code(), "E1001");
        assert_eq!(ErrorCode::CallNotFound.code(), "E2001");
    }

    #[test]
    fn state_violations_map_to_conflict() {
        assert_eq!(ErrorCode::ActiveSessionExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::SessionNotWaiting.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::SessionEnded.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn participant_violations_are_forbidden() {
        assert_eq!(ErrorCode::NotSessionParticipant.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::CannotBlockSelf.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        assert_eq!(ErrorCode::SessionNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::MessageNotFound.status_code(), StatusCode::NOT_FOUND);
    }
}
