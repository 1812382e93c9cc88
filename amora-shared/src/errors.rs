use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Session errors
/// - E3xxx: Matching errors
/// - E4xxx: Messaging errors
/// - E5xxx: Date negotiation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,

    // Session (E1xxx)
    TokenExpired,
    TokenInvalid,
    UserOffline,

    // Matching (E3xxx)
    ProfileNotFound,
    InvalidTarget,
    BlockedPair,
    PairUnliked,
    MissingMainPicture,
    DuplicateLike,

    // Messaging (E4xxx)
    ConversationNotFound,
    NotConversationParticipant,

    // Date negotiation (E5xxx)
    InviteNotFound,
    InvitePending,
    InviteNotAccepted,
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
            Self::BadRequest => "E0006",

            // Session
            Self::TokenExpired => "E1001",
            Self::TokenInvalid => "E1002",
            Self::UserOffline => "E1003",

            // Matching
            Self::ProfileNotFound => "E3001",
            Self::InvalidTarget => "E3002",
            Self::BlockedPair => "E3003",
            Self::PairUnliked => "E3004",
            Self::MissingMainPicture => "E3005",
            Self::DuplicateLike => "E3006",

            // Messaging
            Self::ConversationNotFound => "E4001",
            Self::NotConversationParticipant => "E4002",

            // Date negotiation
            Self::InviteNotFound => "E5001",
            Self::InvitePending => "E5002",
            Self::InviteNotAccepted => "E5003",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::ProfileNotFound | Self::ConversationNotFound
            | Self::InviteNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden | Self::UserOffline | Self::InvalidTarget | Self::BlockedPair
            | Self::PairUnliked | Self::NotConversationParticipant
            | Self::InviteNotAccepted => StatusCode::FORBIDDEN,
            Self::MissingMainPicture => StatusCode::PRECONDITION_FAILED,
            Self::DuplicateLike | Self::InvitePending => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known { code: ErrorCode, message: String },

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
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message } => {
                (code.status_code(), ApiErrorResponse::new(code.code(), message))
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
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ApiErrorResponse::new("E0002", msg))
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_status_codes() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidTarget.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::BlockedPair.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::MissingMainPicture.status_code(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(ErrorCode::DuplicateLike.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InvitePending.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InviteNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::BadRequest,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::UserOffline,
            ErrorCode::ProfileNotFound,
            ErrorCode::InvalidTarget,
            ErrorCode::BlockedPair,
            ErrorCode::PairUnliked,
            ErrorCode::MissingMainPicture,
            ErrorCode::DuplicateLike,
            ErrorCode::ConversationNotFound,
            ErrorCode::NotConversationParticipant,
            ErrorCode::InviteNotFound,
            ErrorCode::InvitePending,
            ErrorCode::InviteNotAccepted,
        ];
        let mut codes: Vec<&str> = all.iter().map(|c| c.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
